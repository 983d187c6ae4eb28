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
use std::fs;
use std::path::{Path, PathBuf};

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::error::{HiveSinkError, Result};
use crate::formats::{CompressionKind, FileWriteResult, FileWriter, FileWriterFactory};

fn parquet_compression(kind: CompressionKind) -> Compression {
    match kind {
        CompressionKind::None => Compression::UNCOMPRESSED,
        CompressionKind::Snappy => Compression::SNAPPY,
        CompressionKind::Gzip => Compression::GZIP(GzipLevel::default()),
        CompressionKind::Lz4 => Compression::LZ4,
        CompressionKind::Zstd => Compression::ZSTD(ZstdLevel::default()),
    }
}

pub struct ParquetFileWriter {
    writer: ArrowWriter<fs::File>,
    path: PathBuf,
    rows: u64,
}

impl FileWriter for ParquetFileWriter {
    fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch)?;
        // Seal the in-progress row group so appended data reaches the file
        // and shows up in the flushed-byte count.
        self.writer.flush()?;
        self.rows += batch.num_rows() as u64;
        Ok(())
    }

    /// `bytes_written` counts bytes accepted by the file writer rather than
    /// bytes the OS has persisted, so it moves even when a small row group
    /// sits in the writer's internal buffer.
    fn completed_bytes(&self) -> u64 {
        self.writer.bytes_written() as u64
    }

    fn finish(self: Box<Self>) -> Result<FileWriteResult> {
        let unboxed = *self;
        let ParquetFileWriter {
            writer, path, rows, ..
        } = unboxed;
        writer.close()?;
        let file_size_bytes = fs::metadata(&path)?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileWriteResult {
            file_name,
            row_count: rows,
            file_size_bytes,
        })
    }

    fn abort(self: Box<Self>) -> Result<()> {
        let unboxed = *self;
        let ParquetFileWriter { writer, path, .. } = unboxed;
        drop(writer);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

pub struct ParquetWriterFactory {
    compression: CompressionKind,
}

impl ParquetWriterFactory {
    pub fn new(compression: CompressionKind) -> Self {
        Self { compression }
    }
}

impl FileWriterFactory for ParquetWriterFactory {
    fn create_writer(&self, path: &Path, schema: SchemaRef) -> Result<Box<dyn FileWriter>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if path.exists() {
            return Err(HiveSinkError::FileConflict(path.display().to_string()));
        }
        let file = fs::File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(parquet_compression(self.compression))
            .build();
        let writer = ArrowWriter::try_new(file, schema, Some(props))?;
        Ok(Box::new(ParquetFileWriter {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        }))
    }
}
