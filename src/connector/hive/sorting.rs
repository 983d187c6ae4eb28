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

use arrow::compute::SortOptions;
use serde_json::{Map, Value, json};

use crate::error::{HiveSinkError, Result};

/// Ascending/descending plus null placement for one sort key.
///
/// The storage format only supports nulls-first ascending and nulls-last
/// descending runs, so the other two combinations are rejected when a
/// [`HiveSortingColumn`] is built.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct SortOrder {
    ascending: bool,
    nulls_first: bool,
}

impl SortOrder {
    pub fn new(ascending: bool, nulls_first: bool) -> Self {
        Self {
            ascending,
            nulls_first,
        }
    }

    pub fn ascending(&self) -> bool {
        self.ascending
    }

    pub fn nulls_first(&self) -> bool {
        self.nulls_first
    }

    /// Arrow sort options for this order, used when sorting a destination
    /// buffer before it reaches the file writer.
    pub fn sort_options(&self) -> SortOptions {
        SortOptions {
            descending: !self.ascending,
            nulls_first: self.nulls_first,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} NULLS {}",
            if self.ascending { "ASC" } else { "DESC" },
            if self.nulls_first { "FIRST" } else { "LAST" }
        )
    }
}

/// A single in-bucket sort key: column name plus its required order.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct HiveSortingColumn {
    column: String,
    order: SortOrder,
}

impl HiveSortingColumn {
    const SERDE_NAME: &'static str = "HiveSortingColumn";

    pub fn new(column: impl Into<String>, order: SortOrder) -> Result<Self> {
        let column = column.into();
        if column.is_empty() {
            return Err(HiveSinkError::InvalidArgument(
                "sort column must be set".to_string(),
            ));
        }
        if order.ascending() != order.nulls_first() {
            return Err(HiveSinkError::InvalidArgument(format!(
                "bad sort order: [COLUMN[{column}] ORDER[{order}]]"
            )));
        }
        Ok(Self { column, order })
    }

    pub fn sort_column(&self) -> &str {
        &self.column
    }

    pub fn sort_order(&self) -> SortOrder {
        self.order
    }

    /// Structured object form used for catalog persistence. Re-serializing
    /// the deserialized value is byte-identical: serde_json object keys are
    /// ordered, so equal values imply equal bytes.
    pub fn serialize(&self) -> Value {
        json!({
            "name": Self::SERDE_NAME,
            "columnName": self.column,
            "order": {
                "ascending": self.order.ascending(),
                "nullsFirst": self.order.nulls_first(),
            },
        })
    }

    pub fn deserialize(value: &Value) -> Result<Self> {
        let obj = json_object(value, Self::SERDE_NAME)?;
        expect_serde_name(obj, Self::SERDE_NAME)?;
        let column = json_str(obj, "columnName", Self::SERDE_NAME)?;
        let order = json_object(
            obj.get("order").ok_or_else(|| missing("order", Self::SERDE_NAME))?,
            Self::SERDE_NAME,
        )?;
        let ascending = json_bool(order, "ascending", Self::SERDE_NAME)?;
        let nulls_first = json_bool(order, "nullsFirst", Self::SERDE_NAME)?;
        Self::new(column, SortOrder::new(ascending, nulls_first))
    }
}

impl fmt::Display for HiveSortingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[COLUMN[{}] ORDER[{}]]", self.column, self.order)
    }
}

pub(crate) fn missing(key: &str, what: &str) -> HiveSinkError {
    HiveSinkError::Deserialization(format!("{what}: missing field `{key}`"))
}

pub(crate) fn json_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| HiveSinkError::Deserialization(format!("{what}: expected an object")))
}

pub(crate) fn expect_serde_name(obj: &Map<String, Value>, expected: &str) -> Result<()> {
    match obj.get("name").and_then(Value::as_str) {
        Some(name) if name == expected => Ok(()),
        Some(name) => Err(HiveSinkError::Deserialization(format!(
            "{expected}: unexpected serialized name `{name}`"
        ))),
        None => Err(missing("name", expected)),
    }
}

pub(crate) fn json_str<'a>(obj: &'a Map<String, Value>, key: &str, what: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(key, what))
}

pub(crate) fn json_bool(obj: &Map<String, Value>, key: &str, what: &str) -> Result<bool> {
    obj.get(key)
        .and_then(Value::as_bool)
        .ok_or_else(|| missing(key, what))
}

pub(crate) fn json_u64(obj: &Map<String, Value>, key: &str, what: &str) -> Result<u64> {
    obj.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| missing(key, what))
}

pub(crate) fn json_array<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    what: &str,
) -> Result<&'a Vec<Value>> {
    obj.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| missing(key, what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_orders_construct_and_render() {
        let asc = HiveSortingColumn::new("a", SortOrder::new(true, true)).expect("asc");
        assert_eq!(asc.sort_column(), "a");
        assert_eq!(asc.sort_order(), SortOrder::new(true, true));
        assert_eq!(asc.to_string(), "[COLUMN[a] ORDER[ASC NULLS FIRST]]");

        let desc = HiveSortingColumn::new("a", SortOrder::new(false, false)).expect("desc");
        assert_eq!(desc.to_string(), "[COLUMN[a] ORDER[DESC NULLS LAST]]");
    }

    #[test]
    fn empty_column_is_rejected() {
        let err = HiveSortingColumn::new("", SortOrder::new(true, true)).expect_err("empty");
        assert_eq!(err.to_string(), "sort column must be set");
    }

    #[test]
    fn illegal_orders_are_rejected_with_rendered_order() {
        let err = HiveSortingColumn::new("a", SortOrder::new(true, false)).expect_err("asc/last");
        assert_eq!(
            err.to_string(),
            "bad sort order: [COLUMN[a] ORDER[ASC NULLS LAST]]"
        );
        let err = HiveSortingColumn::new("a", SortOrder::new(false, true)).expect_err("desc/first");
        assert_eq!(
            err.to_string(),
            "bad sort order: [COLUMN[a] ORDER[DESC NULLS FIRST]]"
        );
    }

    #[test]
    fn serialize_round_trips_byte_identical() {
        for order in [SortOrder::new(true, true), SortOrder::new(false, false)] {
            let column = HiveSortingColumn::new("k1", order).expect("legal order");
            let obj = column.serialize();
            let back = HiveSortingColumn::deserialize(&obj).expect("deserialize");
            assert_eq!(back, column);
            assert_eq!(back.serialize(), obj);
            assert_eq!(
                serde_json::to_string(&back.serialize()).unwrap(),
                serde_json::to_string(&obj).unwrap()
            );
        }
    }

    #[test]
    fn malformed_input_fails_deserialization() {
        let err = HiveSortingColumn::deserialize(&serde_json::json!("nope")).expect_err("scalar");
        assert!(matches!(err, HiveSinkError::Deserialization(_)));

        let err = HiveSortingColumn::deserialize(&serde_json::json!({
            "name": "SomethingElse",
            "columnName": "a",
        }))
        .expect_err("wrong name tag");
        assert!(matches!(err, HiveSinkError::Deserialization(_)));

        let err = HiveSortingColumn::deserialize(&serde_json::json!({
            "name": "HiveSortingColumn",
            "columnName": "a",
        }))
        .expect_err("missing order");
        assert!(err.to_string().contains("missing field `order`"));
    }
}
