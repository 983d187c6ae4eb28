// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod parquet;

/// Envelope format of a written data file.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FileFormat {
    Parquet,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Parquet => f.write_str("PARQUET"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CompressionKind {
    None,
    Snappy,
    Gzip,
    Lz4,
    Zstd,
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionKind::None => f.write_str("NONE"),
            CompressionKind::Snappy => f.write_str("SNAPPY"),
            CompressionKind::Gzip => f.write_str("GZIP"),
            CompressionKind::Lz4 => f.write_str("LZ4"),
            CompressionKind::Zstd => f.write_str("ZSTD"),
        }
    }
}

/// What one finished destination file looks like to the committer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileWriteResult {
    pub file_name: String,
    pub row_count: u64,
    pub file_size_bytes: u64,
}

/// One open destination file. Implementations own the underlying file handle
/// and must release it on both `finish` and `abort`.
pub trait FileWriter: Send {
    fn append(&mut self, batch: &RecordBatch) -> Result<()>;

    /// Bytes the writer has flushed so far. Monotone across appends.
    fn completed_bytes(&self) -> u64;

    /// Finalize the file and report what was written.
    fn finish(self: Box<Self>) -> Result<FileWriteResult>;

    /// Drop all writer state and remove the partial file.
    fn abort(self: Box<Self>) -> Result<()>;
}

/// Factory seam between the sink and the physical encoder. Creating a writer
/// for an already existing target file is a fail-fast error.
pub trait FileWriterFactory: Send + Sync {
    fn create_writer(&self, path: &Path, schema: SchemaRef) -> Result<Box<dyn FileWriter>>;
}

pub fn writer_factory(
    format: FileFormat,
    compression: CompressionKind,
) -> Arc<dyn FileWriterFactory> {
    match format {
        FileFormat::Parquet => Arc::new(parquet::ParquetWriterFactory::new(compression)),
    }
}
