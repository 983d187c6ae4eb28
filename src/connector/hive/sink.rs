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
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Int8Array, Int16Array, Int32Array, Int64Array,
    LargeStringArray, StringArray, TimestampMicrosecondArray, UInt32Array,
};
use arrow::compute::{SortColumn, SortOptions, concat_batches, lexsort_to_indices, take};
use arrow::datatypes::{DataType, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::config::HiveSinkConfig;
use crate::common::types::UniqueId;
use crate::connector::hive::bucket::HiveBucketProperty;
use crate::connector::hive::location::{
    DEFAULT_PARTITION_VALUE, build_relative_path, file_name, partition_subdirectory,
};
use crate::error::{HiveSinkError, Result};
use crate::formats::{CompressionKind, FileFormat, FileWriter, FileWriterFactory};

const UNIX_EPOCH_DAY_OFFSET: i32 = 719_163;

/// Commit visibility policy. The sink records the tag in commit metadata and
/// otherwise passes it through; staged/transactional finalization happens in
/// the coordinator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CommitStrategy {
    NoCommit,
    TaskCommit,
}

/// Everything the planner resolved about the insert target.
#[derive(Clone, Debug)]
pub struct HiveInsertTableHandle {
    pub output_directory: PathBuf,
    pub partitioned_by: Vec<String>,
    pub bucket_property: Option<HiveBucketProperty>,
    pub file_format: FileFormat,
    pub compression: CompressionKind,
}

/// Per-write-operation identity and tuning, supplied by the caller. The sink
/// never consults ambient process-wide state.
#[derive(Clone, Debug)]
pub struct HiveSinkContext {
    pub query_id: UniqueId,
    pub task_id: String,
    pub config: HiveSinkConfig,
}

/// Catalog-ready description of one committed destination file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HivePartitionUpdate {
    pub file_name: String,
    pub partition: Option<String>,
    pub bucket: Option<u32>,
    pub row_count: u64,
    pub file_size_bytes: u64,
    pub commit_strategy: CommitStrategy,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum SinkState {
    Running,
    Closed,
    Aborted,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct DestinationKey {
    partition: Option<String>,
    bucket: Option<u32>,
}

struct Destination {
    key: DestinationKey,
    relative_path: String,
    absolute_path: PathBuf,
    writer: Option<Box<dyn FileWriter>>,
    /// Batches held back for the in-bucket sort; only used when the bucket
    /// property carries sort columns.
    pending: Vec<RecordBatch>,
    reported_bytes: u64,
}

/// Single-writer data sink materializing row batches as partition/bucket
/// files under the insert handle's output directory.
///
/// Lifecycle: `append_data` while `Running`, then exactly one effective
/// `close(true)` (commit, repeatable and memoized) or `close(false)` (abort,
/// repeatable no-op). The caller drives all calls from one logical thread;
/// the sink performs no internal locking.
pub struct HiveDataSink {
    schema: SchemaRef,
    handle: HiveInsertTableHandle,
    ctx: HiveSinkContext,
    commit_strategy: CommitStrategy,
    writer_factory: Arc<dyn FileWriterFactory>,
    partition_indices: Vec<usize>,
    sort_columns: Vec<(usize, SortOptions)>,
    state: SinkState,
    dest_index: HashMap<DestinationKey, usize>,
    destinations: Vec<Destination>,
    completed_bytes: u64,
    commit_result: Option<Vec<HivePartitionUpdate>>,
}

impl HiveDataSink {
    pub fn new(
        schema: SchemaRef,
        handle: HiveInsertTableHandle,
        ctx: HiveSinkContext,
        commit_strategy: CommitStrategy,
        writer_factory: Arc<dyn FileWriterFactory>,
    ) -> Result<Self> {
        let mut partition_indices = Vec::with_capacity(handle.partitioned_by.len());
        for name in &handle.partitioned_by {
            let (index, _) = schema.column_with_name(name).ok_or_else(|| {
                HiveSinkError::InvalidArgument(format!(
                    "partition column {name} not found in output schema"
                ))
            })?;
            partition_indices.push(index);
        }

        let mut sort_columns = Vec::new();
        if let Some(property) = &handle.bucket_property {
            for (name, ty) in property.bucketed_by().iter().zip(property.bucketed_types()) {
                let (_, field) = schema.column_with_name(name).ok_or_else(|| {
                    HiveSinkError::InvalidArgument(format!(
                        "bucket column {name} not found in output schema"
                    ))
                })?;
                if !ty.matches_arrow(field.data_type()) {
                    return Err(HiveSinkError::InvalidArgument(format!(
                        "bucket column {name} declared {ty} but output schema carries {}",
                        field.data_type()
                    )));
                }
            }
            for sorting in property.sorted_by() {
                let (index, _) = schema.column_with_name(sorting.sort_column()).ok_or_else(
                    || {
                        HiveSinkError::InvalidArgument(format!(
                            "sort column {} not found in output schema",
                            sorting.sort_column()
                        ))
                    },
                )?;
                sort_columns.push((index, sorting.sort_order().sort_options()));
            }
        }

        Ok(Self {
            schema,
            handle,
            ctx,
            commit_strategy,
            writer_factory,
            partition_indices,
            sort_columns,
            state: SinkState::Running,
            dest_index: HashMap::new(),
            destinations: Vec::new(),
            completed_bytes: 0,
            commit_result: None,
        })
    }

    /// Route every row of `batch` to its destination and hand it to that
    /// destination's writer (or sort buffer). Legal only while `Running`.
    pub fn append_data(&mut self, batch: &RecordBatch) -> Result<()> {
        match self.state {
            SinkState::Closed => return Err(HiveSinkError::SinkClosed),
            SinkState::Aborted => return Err(HiveSinkError::SinkAborted),
            SinkState::Running => {}
        }
        if batch.schema_ref().fields() != self.schema.fields() {
            return Err(HiveSinkError::InvalidArgument(
                "row batch does not match the output schema".to_string(),
            ));
        }
        if batch.num_rows() == 0 {
            return Ok(());
        }

        let partitions = self.partition_dirs(batch)?;
        let buckets = match &self.handle.bucket_property {
            Some(property) => Some(property.compute_bucket_ids(batch)?),
            None => None,
        };

        if partitions.is_none() && buckets.is_none() {
            let key = DestinationKey {
                partition: None,
                bucket: None,
            };
            return self.write_to_destination(key, batch.clone());
        }

        let mut groups: Vec<(DestinationKey, Vec<u32>)> = Vec::new();
        let mut group_of: HashMap<DestinationKey, usize> = HashMap::new();
        for row in 0..batch.num_rows() {
            let key = DestinationKey {
                partition: partitions.as_ref().map(|dirs| dirs[row].clone()),
                bucket: buckets.as_ref().map(|ids| ids[row]),
            };
            match group_of.get(&key) {
                Some(&group) => groups[group].1.push(row as u32),
                None => {
                    group_of.insert(key.clone(), groups.len());
                    groups.push((key, vec![row as u32]));
                }
            }
        }

        for (key, rows) in groups {
            let indices = UInt32Array::from(rows);
            let columns = batch
                .columns()
                .iter()
                .map(|column| take(column.as_ref(), &indices, None))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let routed = RecordBatch::try_new(self.schema.clone(), columns)?;
            self.write_to_destination(key, routed)?;
        }
        Ok(())
    }

    /// Terminal operation: commit (`true`) or abort (`false`). See the
    /// lifecycle rules on [`HiveDataSink`].
    pub fn close(&mut self, commit: bool) -> Result<Vec<HivePartitionUpdate>> {
        if commit {
            match self.state {
                SinkState::Aborted => Err(HiveSinkError::InvalidState(
                    "can't close an aborted sink".to_string(),
                )),
                SinkState::Closed => Ok(self.commit_result.clone().unwrap_or_default()),
                SinkState::Running => match self.commit_destinations() {
                    Ok(updates) => Ok(updates),
                    Err(err) => {
                        // A partial commit cannot be resumed: some writers are
                        // already consumed. Remove any files they finished and
                        // leave the sink aborted.
                        for dest in &self.destinations {
                            if dest.writer.is_none() && dest.absolute_path.exists() {
                                let _ = fs::remove_file(&dest.absolute_path);
                            }
                        }
                        self.abort_destinations();
                        Err(err)
                    }
                },
            }
        } else {
            match self.state {
                SinkState::Closed => Err(HiveSinkError::InvalidState(
                    "can't abort a closed sink".to_string(),
                )),
                SinkState::Aborted => Ok(Vec::new()),
                SinkState::Running => {
                    self.abort_destinations();
                    Ok(Vec::new())
                }
            }
        }
    }

    /// Bytes reported as flushed by destination writers so far. Monotone
    /// while `Running`, frozen once the sink is closed or aborted.
    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes
    }

    pub fn commit_strategy(&self) -> CommitStrategy {
        self.commit_strategy
    }

    fn commit_destinations(&mut self) -> Result<Vec<HivePartitionUpdate>> {
        let mut updates = Vec::with_capacity(self.destinations.len());
        for i in 0..self.destinations.len() {
            let pending = std::mem::take(&mut self.destinations[i].pending);
            if !pending.is_empty() {
                let sorted = self.sort_buffered(&pending)?;
                let chunk_rows = self.ctx.config.sort_flush_batch_rows.max(1);
                let mut offset = 0;
                while offset < sorted.num_rows() {
                    let length = chunk_rows.min(sorted.num_rows() - offset);
                    let slice = sorted.slice(offset, length);
                    let dest = &mut self.destinations[i];
                    let writer = dest.writer.as_mut().ok_or_else(|| {
                        HiveSinkError::InvalidState(format!(
                            "destination {} lost its writer before commit",
                            dest.relative_path
                        ))
                    })?;
                    writer.append(&slice)?;
                    offset += length;
                }
            }

            let dest = &mut self.destinations[i];
            let Some(writer) = dest.writer.take() else {
                continue;
            };
            let result = writer.finish()?;
            self.completed_bytes += result
                .file_size_bytes
                .saturating_sub(dest.reported_bytes);
            dest.reported_bytes = result.file_size_bytes;
            updates.push(HivePartitionUpdate {
                file_name: result.file_name,
                partition: dest.key.partition.clone(),
                bucket: dest.key.bucket,
                row_count: result.row_count,
                file_size_bytes: result.file_size_bytes,
                commit_strategy: self.commit_strategy,
            });
        }
        info!(
            files = updates.len(),
            bytes = self.completed_bytes,
            "hive data sink committed"
        );
        self.state = SinkState::Closed;
        self.commit_result = Some(updates.clone());
        Ok(updates)
    }

    fn abort_destinations(&mut self) {
        for dest in self.destinations.iter_mut() {
            dest.pending.clear();
            if let Some(writer) = dest.writer.take() {
                if let Err(err) = writer.abort() {
                    warn!(
                        path = %dest.absolute_path.display(),
                        "failed to remove aborted write file: {err}"
                    );
                }
            }
        }
        info!(
            destinations = self.destinations.len(),
            "hive data sink aborted"
        );
        self.destinations.clear();
        self.dest_index.clear();
        self.state = SinkState::Aborted;
    }

    fn write_to_destination(&mut self, key: DestinationKey, batch: RecordBatch) -> Result<()> {
        let index = match self.dest_index.get(&key) {
            Some(&index) => index,
            None => self.open_destination(key)?,
        };
        let dest = &mut self.destinations[index];
        if self.sort_columns.is_empty() {
            let writer = dest.writer.as_mut().ok_or_else(|| {
                HiveSinkError::InvalidState(format!(
                    "destination {} lost its writer while running",
                    dest.relative_path
                ))
            })?;
            writer.append(&batch)?;
            let flushed = writer.completed_bytes();
            self.completed_bytes += flushed.saturating_sub(dest.reported_bytes);
            dest.reported_bytes = flushed;
        } else {
            dest.pending.push(batch);
        }
        Ok(())
    }

    fn open_destination(&mut self, key: DestinationKey) -> Result<usize> {
        let seq = self.destinations.len();
        let base = format!(
            "{}_{}_{}",
            self.ctx.task_id,
            self.ctx.query_id.to_uuid_string(),
            seq
        );
        let bucket = key.bucket.map(|id| {
            let count = self
                .handle
                .bucket_property
                .as_ref()
                .map(HiveBucketProperty::bucket_count)
                .unwrap_or(1);
            (id, count)
        });
        let name = file_name(&base, bucket, self.handle.file_format.extension());
        let relative_path = build_relative_path(key.partition.as_deref(), &name);
        let absolute_path = self.handle.output_directory.join(&relative_path);
        debug!(path = %absolute_path.display(), "open hive write destination");
        let writer = self
            .writer_factory
            .create_writer(&absolute_path, self.schema.clone())?;
        self.destinations.push(Destination {
            key: key.clone(),
            relative_path,
            absolute_path,
            writer: Some(writer),
            pending: Vec::new(),
            reported_bytes: 0,
        });
        let index = self.destinations.len() - 1;
        self.dest_index.insert(key, index);
        Ok(index)
    }

    fn sort_buffered(&self, pending: &[RecordBatch]) -> Result<RecordBatch> {
        let merged = concat_batches(&self.schema, pending)?;
        let mut sort_columns = self
            .sort_columns
            .iter()
            .map(|(index, options)| SortColumn {
                values: merged.column(*index).clone(),
                options: Some(*options),
            })
            .collect::<Vec<_>>();
        // lexsort is not stable; a trailing row-sequence key keeps the
        // append order of rows with equal sort keys.
        let sequence: ArrayRef = Arc::new(UInt32Array::from_iter_values(
            0..merged.num_rows() as u32,
        ));
        sort_columns.push(SortColumn {
            values: sequence,
            options: None,
        });
        let indices = lexsort_to_indices(&sort_columns, None)?;
        let columns = merged
            .columns()
            .iter()
            .map(|column| take(column.as_ref(), &indices, None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(RecordBatch::try_new(self.schema.clone(), columns)?)
    }

    fn partition_dirs(&self, batch: &RecordBatch) -> Result<Option<Vec<String>>> {
        if self.partition_indices.is_empty() {
            return Ok(None);
        }
        let mut dirs = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let mut pairs = Vec::with_capacity(self.partition_indices.len());
            for (name, index) in self
                .handle
                .partitioned_by
                .iter()
                .zip(&self.partition_indices)
            {
                let value = format_partition_value(batch.column(*index), row)?;
                pairs.push((name.clone(), value));
            }
            dirs.push(partition_subdirectory(&pairs));
        }
        Ok(Some(dirs))
    }
}

fn format_partition_value(column: &ArrayRef, row: usize) -> Result<String> {
    if column.is_null(row) {
        return Ok(DEFAULT_PARTITION_VALUE.to_string());
    }
    macro_rules! primitive {
        ($array_ty:ty) => {{
            let array = column
                .as_any()
                .downcast_ref::<$array_ty>()
                .expect("checked data type");
            array.value(row).to_string()
        }};
    }
    let rendered = match column.data_type() {
        DataType::Boolean => primitive!(BooleanArray),
        DataType::Int8 => primitive!(Int8Array),
        DataType::Int16 => primitive!(Int16Array),
        DataType::Int32 => primitive!(Int32Array),
        DataType::Int64 => primitive!(Int64Array),
        DataType::Utf8 => primitive!(StringArray),
        DataType::LargeUtf8 => primitive!(LargeStringArray),
        DataType::Date32 => {
            let array = column
                .as_any()
                .downcast_ref::<Date32Array>()
                .expect("checked data type");
            let days = array.value(row);
            days.checked_add(UNIX_EPOCH_DAY_OFFSET)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| {
                    HiveSinkError::InvalidArgument(format!(
                        "partition date out of range: {days} days since epoch"
                    ))
                })?
                .format("%Y-%m-%d")
                .to_string()
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let array = column
                .as_any()
                .downcast_ref::<TimestampMicrosecondArray>()
                .expect("checked data type");
            let micros = array.value(row);
            DateTime::<Utc>::from_timestamp_micros(micros)
                .ok_or_else(|| {
                    HiveSinkError::InvalidArgument(format!(
                        "partition timestamp out of range: {micros} us since epoch"
                    ))
                })?
                .naive_utc()
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        }
        other => {
            return Err(HiveSinkError::InvalidArgument(format!(
                "unsupported partition column type: {other}"
            )));
        }
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::{Field, Schema};

    use super::*;

    #[test]
    fn partition_values_render_in_hive_layout() {
        let column: ArrayRef = Arc::new(Date32Array::from(vec![Some(0), Some(19_723), None]));
        assert_eq!(format_partition_value(&column, 0).unwrap(), "1970-01-01");
        assert_eq!(format_partition_value(&column, 1).unwrap(), "2024-01-01");
        assert_eq!(
            format_partition_value(&column, 2).unwrap(),
            DEFAULT_PARTITION_VALUE
        );

        let column: ArrayRef = Arc::new(TimestampMicrosecondArray::from(vec![Some(0i64)]));
        assert_eq!(
            format_partition_value(&column, 0).unwrap(),
            "1970-01-01 00:00:00"
        );
    }

    #[test]
    fn extreme_partition_dates_are_rejected() {
        let column: ArrayRef = Arc::new(Date32Array::from(vec![Some(i32::MAX), Some(i32::MIN)]));
        for row in 0..2 {
            let err = format_partition_value(&column, row).expect_err("date out of range");
            assert!(err.to_string().contains("partition date out of range"));
        }
    }

    #[test]
    fn unsupported_partition_type_is_rejected() {
        let column: ArrayRef = Arc::new(arrow::array::Float64Array::from(vec![1.0]));
        let err = format_partition_value(&column, 0).expect_err("float partition");
        assert!(err.to_string().contains("unsupported partition column type"));
    }

    #[test]
    fn missing_partition_column_fails_construction() {
        let schema = Arc::new(Schema::new(vec![Field::new("a", DataType::Int64, true)]));
        let handle = HiveInsertTableHandle {
            output_directory: PathBuf::from("/tmp/out"),
            partitioned_by: vec!["ds".to_string()],
            bucket_property: None,
            file_format: FileFormat::Parquet,
            compression: CompressionKind::Snappy,
        };
        let ctx = HiveSinkContext {
            query_id: UniqueId::new(1, 2),
            task_id: "task0".to_string(),
            config: HiveSinkConfig::default(),
        };
        let Err(err) = HiveDataSink::new(
            schema,
            handle,
            ctx,
            CommitStrategy::NoCommit,
            crate::formats::writer_factory(FileFormat::Parquet, CompressionKind::Snappy),
        ) else {
            panic!("missing partition column must fail construction");
        };
        assert_eq!(err.to_string(), "partition column ds not found in output schema");
    }
}
