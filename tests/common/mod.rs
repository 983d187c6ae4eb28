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
//! Shared fixtures for the hive sink integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, Float32Array, Float64Array, Int16Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use hivesink::hivesink_config::HiveSinkConfig;
use hivesink::{
    CommitStrategy, CompressionKind, FileFormat, HiveDataSink, HiveInsertTableHandle,
    HiveSinkContext, UniqueId, writer_factory,
};

/// Six-column row schema mirroring a typical insert target.
pub fn test_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("c0", DataType::Int64, true),
        Field::new("c1", DataType::Int32, true),
        Field::new("c2", DataType::Int16, true),
        Field::new("c3", DataType::Float32, true),
        Field::new("c4", DataType::Float64, true),
        Field::new("c5", DataType::Utf8, true),
    ]))
}

/// Deterministic pseudo-random batch; `seed` keeps batches distinct while
/// runs stay reproducible.
pub fn test_batch(schema: &SchemaRef, rows: usize, seed: u64) -> RecordBatch {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        state >> 16
    };
    let mut c0 = Vec::with_capacity(rows);
    let mut c1 = Vec::with_capacity(rows);
    let mut c2 = Vec::with_capacity(rows);
    let mut c3 = Vec::with_capacity(rows);
    let mut c4 = Vec::with_capacity(rows);
    let mut c5 = Vec::with_capacity(rows);
    for _ in 0..rows {
        let v = next();
        if v % 97 == 0 {
            c0.push(None);
        } else {
            c0.push(Some(v as i64));
        }
        c1.push(Some((v % 1_000) as i32));
        c2.push(Some((v % 100) as i16));
        c3.push(Some((v % 10_000) as f32 / 7.0));
        c4.push(Some((v % 100_000) as f64 / 13.0));
        c5.push(Some(format!("s{}", v % 500)));
    }
    RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(c0)),
            Arc::new(Int32Array::from(c1)),
            Arc::new(Int16Array::from(c2)),
            Arc::new(Float32Array::from(c3)),
            Arc::new(Float64Array::from(c4)),
            Arc::new(StringArray::from(c5)),
        ],
    )
    .expect("test batch")
}

pub fn test_context() -> HiveSinkContext {
    HiveSinkContext {
        query_id: UniqueId::new(0x1122_3344_5566_7788, 0x99aa_bbcc_ddee_ff00u64 as i64),
        task_id: "task0".to_string(),
        config: HiveSinkConfig::default(),
    }
}

pub fn unpartitioned_handle(output_directory: &Path) -> HiveInsertTableHandle {
    HiveInsertTableHandle {
        output_directory: output_directory.to_path_buf(),
        partitioned_by: vec![],
        bucket_property: None,
        file_format: FileFormat::Parquet,
        compression: CompressionKind::Zstd,
    }
}

pub fn create_sink(schema: SchemaRef, handle: HiveInsertTableHandle) -> HiveDataSink {
    let factory = writer_factory(handle.file_format, handle.compression);
    HiveDataSink::new(
        schema,
        handle,
        test_context(),
        CommitStrategy::NoCommit,
        factory,
    )
    .expect("create data sink")
}

pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).expect("read dir") {
            let entry = entry.expect("dir entry");
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

pub fn read_written_batches(dir: &Path) -> Vec<RecordBatch> {
    let mut batches = Vec::new();
    for path in list_files(dir) {
        let file = fs::File::open(&path).expect("open written file");
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .expect("reader builder")
            .build()
            .expect("reader");
        for batch in reader {
            batches.push(batch.expect("read batch"));
        }
    }
    batches
}

/// Render every row of every batch as one string, for order-insensitive
/// comparison of written data against appended input.
pub fn row_multiset(batches: &[RecordBatch]) -> Vec<String> {
    let mut rows = Vec::new();
    for batch in batches {
        let c0 = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("c0");
        let c1 = batch
            .column(1)
            .as_any()
            .downcast_ref::<Int32Array>()
            .expect("c1");
        let c2 = batch
            .column(2)
            .as_any()
            .downcast_ref::<Int16Array>()
            .expect("c2");
        let c3 = batch
            .column(3)
            .as_any()
            .downcast_ref::<Float32Array>()
            .expect("c3");
        let c4 = batch
            .column(4)
            .as_any()
            .downcast_ref::<Float64Array>()
            .expect("c4");
        let c5 = batch
            .column(5)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("c5");
        for row in 0..batch.num_rows() {
            let fmt_opt = |valid: bool, rendered: String| {
                if valid { rendered } else { "null".to_string() }
            };
            rows.push(format!(
                "{}|{}|{}|{}|{}|{}",
                fmt_opt(c0.is_valid(row), c0.value(row).to_string()),
                fmt_opt(c1.is_valid(row), c1.value(row).to_string()),
                fmt_opt(c2.is_valid(row), c2.value(row).to_string()),
                fmt_opt(c3.is_valid(row), format!("{:?}", c3.value(row))),
                fmt_opt(c4.is_valid(row), format!("{:?}", c4.value(row))),
                fmt_opt(c5.is_valid(row), c5.value(row).to_string()),
            ));
        }
    }
    rows.sort();
    rows
}
