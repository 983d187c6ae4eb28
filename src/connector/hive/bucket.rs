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
use std::str::FromStr;

use arrow::array::{
    Array, ArrayRef, BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array,
    Int8Array, Int16Array, Int32Array, Int64Array, LargeBinaryArray, LargeStringArray,
    StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use serde_json::{Value, json};
use twox_hash::XxHash64;

use crate::connector::hive::sorting::{
    HiveSortingColumn, expect_serde_name, json_array, json_object, json_str, json_u64,
};
use crate::connector::hive::types::HiveType;
use crate::error::{HiveSinkError, Result};

/// Which row→bucket hash convention governs a table. The two conventions are
/// mutually incompatible; the kind is carried through to commit metadata
/// unchanged so readers can pick the matching function.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HiveBucketKind {
    PrestoNative,
    HiveCompatible,
}

impl fmt::Display for HiveBucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HiveBucketKind::PrestoNative => f.write_str("PRESTO_NATIVE"),
            HiveBucketKind::HiveCompatible => f.write_str("HIVE_COMPATIBLE"),
        }
    }
}

impl FromStr for HiveBucketKind {
    type Err = HiveSinkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PRESTO_NATIVE" => Ok(HiveBucketKind::PrestoNative),
            "HIVE_COMPATIBLE" => Ok(HiveBucketKind::HiveCompatible),
            other => Err(HiveSinkError::Deserialization(format!(
                "unknown bucket kind: {other}"
            ))),
        }
    }
}

/// How rows of a table are distributed into buckets and ordered within them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HiveBucketProperty {
    kind: HiveBucketKind,
    bucket_count: u32,
    bucketed_by: Vec<String>,
    bucketed_types: Vec<HiveType>,
    sorted_by: Vec<HiveSortingColumn>,
}

impl HiveBucketProperty {
    const SERDE_NAME: &'static str = "HiveBucketProperty";

    pub fn new(
        kind: HiveBucketKind,
        bucket_count: u32,
        bucketed_by: Vec<String>,
        bucketed_types: Vec<HiveType>,
        sorted_by: Vec<HiveSortingColumn>,
    ) -> Result<Self> {
        if bucketed_by.is_empty() {
            return Err(HiveSinkError::InvalidArgument(
                "bucket columns must be set".to_string(),
            ));
        }
        if bucketed_by.len() != bucketed_types.len() {
            return Err(HiveSinkError::InvalidArgument(
                "the number of bucket columns and types do not match".to_string(),
            ));
        }
        if bucket_count == 0 {
            return Err(HiveSinkError::InvalidArgument(
                "bucket count can't be zero".to_string(),
            ));
        }
        Ok(Self {
            kind,
            bucket_count,
            bucketed_by,
            bucketed_types,
            sorted_by,
        })
    }

    pub fn kind(&self) -> HiveBucketKind {
        self.kind
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    pub fn bucketed_by(&self) -> &[String] {
        &self.bucketed_by
    }

    pub fn bucketed_types(&self) -> &[HiveType] {
        &self.bucketed_types
    }

    pub fn sorted_by(&self) -> &[HiveSortingColumn] {
        &self.sorted_by
    }

    pub fn serialize(&self) -> Value {
        json!({
            "name": Self::SERDE_NAME,
            "kind": self.kind.to_string(),
            "bucketCount": self.bucket_count,
            "bucketedBy": self.bucketed_by,
            "bucketedTypes": self.bucketed_types.iter().map(HiveType::name).collect::<Vec<_>>(),
            "sortedBy": self.sorted_by.iter().map(HiveSortingColumn::serialize).collect::<Vec<_>>(),
        })
    }

    pub fn deserialize(value: &Value) -> Result<Self> {
        let obj = json_object(value, Self::SERDE_NAME)?;
        expect_serde_name(obj, Self::SERDE_NAME)?;
        let kind: HiveBucketKind = json_str(obj, "kind", Self::SERDE_NAME)?.parse()?;
        let bucket_count =
            u32::try_from(json_u64(obj, "bucketCount", Self::SERDE_NAME)?).map_err(|_| {
                HiveSinkError::Deserialization(format!(
                    "{}: bucketCount out of range",
                    Self::SERDE_NAME
                ))
            })?;
        let bucketed_by = json_array(obj, "bucketedBy", Self::SERDE_NAME)?
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    HiveSinkError::Deserialization(format!(
                        "{}: bucketedBy entries must be strings",
                        Self::SERDE_NAME
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let bucketed_types = json_array(obj, "bucketedTypes", Self::SERDE_NAME)?
            .iter()
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| {
                        HiveSinkError::Deserialization(format!(
                            "{}: bucketedTypes entries must be strings",
                            Self::SERDE_NAME
                        ))
                    })
                    .and_then(HiveType::from_str)
            })
            .collect::<Result<Vec<_>>>()?;
        let sorted_by = json_array(obj, "sortedBy", Self::SERDE_NAME)?
            .iter()
            .map(HiveSortingColumn::deserialize)
            .collect::<Result<Vec<_>>>()?;
        Self::new(kind, bucket_count, bucketed_by, bucketed_types, sorted_by)
    }

    /// Compute the bucket id of every row in `batch` under this property's
    /// hash convention. Bucket columns are resolved by name against the batch
    /// schema and must match their declared hive types.
    pub fn compute_bucket_ids(&self, batch: &RecordBatch) -> Result<Vec<u32>> {
        match self.kind {
            HiveBucketKind::PrestoNative => {
                let mut combined = vec![0i64; batch.num_rows()];
                for (name, ty) in self.bucketed_by.iter().zip(&self.bucketed_types) {
                    let array = resolve_bucket_column(batch, name, *ty)?;
                    let hashes = presto_native_column_hashes(*ty, array)?;
                    for (acc, hash) in combined.iter_mut().zip(hashes) {
                        *acc = acc.wrapping_mul(31).wrapping_add(hash);
                    }
                }
                Ok(combined
                    .into_iter()
                    .map(|h| ((h & i32::MAX as i64) % self.bucket_count as i64) as u32)
                    .collect())
            }
            HiveBucketKind::HiveCompatible => {
                let mut combined = vec![0i32; batch.num_rows()];
                for (name, ty) in self.bucketed_by.iter().zip(&self.bucketed_types) {
                    let array = resolve_bucket_column(batch, name, *ty)?;
                    let hashes = hive_compatible_column_hashes(*ty, array)?;
                    for (acc, hash) in combined.iter_mut().zip(hashes) {
                        *acc = acc.wrapping_mul(31).wrapping_add(hash);
                    }
                }
                Ok(combined
                    .into_iter()
                    .map(|h| ((h & i32::MAX) as u32) % self.bucket_count)
                    .collect())
            }
        }
    }
}

impl fmt::Display for HiveBucketProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\nHiveBucketProperty[<{} {}>\n", self.kind, self.bucket_count)?;
        f.write_str("\tBucket Columns:\n")?;
        for column in &self.bucketed_by {
            writeln!(f, "\t\t{column}")?;
        }
        f.write_str("\tBucket Types:\n")?;
        for ty in &self.bucketed_types {
            writeln!(f, "\t\t{ty}")?;
        }
        if !self.sorted_by.is_empty() {
            f.write_str("\tSortedBy Columns:\n")?;
            for column in &self.sorted_by {
                writeln!(f, "\t\t{column}")?;
            }
        }
        f.write_str("]\n")
    }
}

fn resolve_bucket_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    ty: HiveType,
) -> Result<&'a ArrayRef> {
    let (index, field) = batch.schema_ref().column_with_name(name).ok_or_else(|| {
        HiveSinkError::InvalidArgument(format!("bucket column {name} not found in row batch"))
    })?;
    if !ty.matches_arrow(field.data_type()) {
        return Err(HiveSinkError::InvalidArgument(format!(
            "bucket column {name} declared {ty} but batch carries {}",
            field.data_type()
        )));
    }
    Ok(batch.column(index))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, ty: HiveType) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        HiveSinkError::InvalidArgument(format!("bucket column array does not match {ty}"))
    })
}

fn xxhash64(bytes: &[u8]) -> i64 {
    XxHash64::oneshot(0, bytes) as i64
}

/// Presto's native per-type hashes: XxHash64 over the value's canonical
/// little-endian encoding, nulls hash to 0, booleans use the Java constants.
fn presto_native_column_hashes(ty: HiveType, array: &ArrayRef) -> Result<Vec<i64>> {
    let num_rows = array.len();
    let mut hashes = vec![0i64; num_rows];
    match ty {
        HiveType::Boolean => {
            let array = downcast::<BooleanArray>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = if array.value(row) { 1231 } else { 1237 };
                }
            }
        }
        HiveType::TinyInt => {
            let array = downcast::<Int8Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = xxhash64(&(array.value(row) as i64).to_le_bytes());
                }
            }
        }
        HiveType::SmallInt => {
            let array = downcast::<Int16Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = xxhash64(&(array.value(row) as i64).to_le_bytes());
                }
            }
        }
        HiveType::Integer => {
            let array = downcast::<Int32Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = xxhash64(&(array.value(row) as i64).to_le_bytes());
                }
            }
        }
        HiveType::BigInt => {
            let array = downcast::<Int64Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = xxhash64(&array.value(row).to_le_bytes());
                }
            }
        }
        HiveType::Real => {
            let array = downcast::<Float32Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    let bits = array.value(row).to_bits() as i32 as i64;
                    *hash = xxhash64(&bits.to_le_bytes());
                }
            }
        }
        HiveType::Double => {
            let array = downcast::<Float64Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    let bits = array.value(row).to_bits() as i64;
                    *hash = xxhash64(&bits.to_le_bytes());
                }
            }
        }
        HiveType::Varchar => match array.data_type() {
            DataType::LargeUtf8 => {
                let array = downcast::<LargeStringArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = xxhash64(array.value(row).as_bytes());
                    }
                }
            }
            _ => {
                let array = downcast::<StringArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = xxhash64(array.value(row).as_bytes());
                    }
                }
            }
        },
        HiveType::Varbinary => match array.data_type() {
            DataType::LargeBinary => {
                let array = downcast::<LargeBinaryArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = xxhash64(array.value(row));
                    }
                }
            }
            _ => {
                let array = downcast::<BinaryArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = xxhash64(array.value(row));
                    }
                }
            }
        },
        HiveType::Date => {
            let array = downcast::<Date32Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = xxhash64(&(array.value(row) as i64).to_le_bytes());
                }
            }
        }
        HiveType::Timestamp => {
            let array = downcast::<TimestampMicrosecondArray>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = xxhash64(&array.value(row).to_le_bytes());
                }
            }
        }
    }
    Ok(hashes)
}

fn java_long_hash(value: i64) -> i32 {
    (value ^ (((value as u64) >> 32) as i64)) as i32
}

fn java_bytes_hash(bytes: &[u8]) -> i32 {
    let mut hash = 0i32;
    for byte in bytes {
        hash = hash.wrapping_mul(31).wrapping_add(*byte as i8 as i32);
    }
    hash
}

/// Hive's ObjectInspectorUtils hash codes: Java wrapping-i32 arithmetic,
/// signed-byte string folding, nulls hash to 0.
fn hive_compatible_column_hashes(ty: HiveType, array: &ArrayRef) -> Result<Vec<i32>> {
    let num_rows = array.len();
    let mut hashes = vec![0i32; num_rows];
    match ty {
        HiveType::Boolean => {
            let array = downcast::<BooleanArray>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = if array.value(row) { 1231 } else { 1237 };
                }
            }
        }
        HiveType::TinyInt => {
            let array = downcast::<Int8Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = array.value(row) as i32;
                }
            }
        }
        HiveType::SmallInt => {
            let array = downcast::<Int16Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = array.value(row) as i32;
                }
            }
        }
        HiveType::Integer => {
            let array = downcast::<Int32Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = array.value(row);
                }
            }
        }
        HiveType::BigInt => {
            let array = downcast::<Int64Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = java_long_hash(array.value(row));
                }
            }
        }
        HiveType::Real => {
            let array = downcast::<Float32Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = array.value(row).to_bits() as i32;
                }
            }
        }
        HiveType::Double => {
            let array = downcast::<Float64Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = java_long_hash(array.value(row).to_bits() as i64);
                }
            }
        }
        HiveType::Varchar => match array.data_type() {
            DataType::LargeUtf8 => {
                let array = downcast::<LargeStringArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = java_bytes_hash(array.value(row).as_bytes());
                    }
                }
            }
            _ => {
                let array = downcast::<StringArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = java_bytes_hash(array.value(row).as_bytes());
                    }
                }
            }
        },
        HiveType::Varbinary => match array.data_type() {
            DataType::LargeBinary => {
                let array = downcast::<LargeBinaryArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = java_bytes_hash(array.value(row));
                    }
                }
            }
            _ => {
                let array = downcast::<BinaryArray>(array, ty)?;
                for (row, hash) in hashes.iter_mut().enumerate() {
                    if array.is_valid(row) {
                        *hash = java_bytes_hash(array.value(row));
                    }
                }
            }
        },
        HiveType::Date => {
            let array = downcast::<Date32Array>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = array.value(row);
                }
            }
        }
        HiveType::Timestamp => {
            let array = downcast::<TimestampMicrosecondArray>(array, ty)?;
            for (row, hash) in hashes.iter_mut().enumerate() {
                if array.is_valid(row) {
                    *hash = java_long_hash(array.value(row));
                }
            }
        }
    }
    Ok(hashes)
}
