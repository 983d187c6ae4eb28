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

use arrow::datatypes::{DataType, TimeUnit};

use crate::error::HiveSinkError;

/// Column types the hive connector buckets and partitions on. Rendered with
/// the catalog's SQL-style names; those names are also the serialized form.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HiveType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Varchar,
    Varbinary,
    Date,
    Timestamp,
}

impl HiveType {
    pub fn name(&self) -> &'static str {
        match self {
            HiveType::Boolean => "BOOLEAN",
            HiveType::TinyInt => "TINYINT",
            HiveType::SmallInt => "SMALLINT",
            HiveType::Integer => "INTEGER",
            HiveType::BigInt => "BIGINT",
            HiveType::Real => "REAL",
            HiveType::Double => "DOUBLE",
            HiveType::Varchar => "VARCHAR",
            HiveType::Varbinary => "VARBINARY",
            HiveType::Date => "DATE",
            HiveType::Timestamp => "TIMESTAMP",
        }
    }

    /// Whether an arrow column of type `data_type` can back a column declared
    /// with this hive type.
    pub fn matches_arrow(&self, data_type: &DataType) -> bool {
        match self {
            HiveType::Boolean => matches!(data_type, DataType::Boolean),
            HiveType::TinyInt => matches!(data_type, DataType::Int8),
            HiveType::SmallInt => matches!(data_type, DataType::Int16),
            HiveType::Integer => matches!(data_type, DataType::Int32),
            HiveType::BigInt => matches!(data_type, DataType::Int64),
            HiveType::Real => matches!(data_type, DataType::Float32),
            HiveType::Double => matches!(data_type, DataType::Float64),
            HiveType::Varchar => matches!(data_type, DataType::Utf8 | DataType::LargeUtf8),
            HiveType::Varbinary => matches!(data_type, DataType::Binary | DataType::LargeBinary),
            HiveType::Date => matches!(data_type, DataType::Date32),
            HiveType::Timestamp => {
                matches!(data_type, DataType::Timestamp(TimeUnit::Microsecond, _))
            }
        }
    }
}

impl fmt::Display for HiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HiveType {
    type Err = HiveSinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOLEAN" => Ok(HiveType::Boolean),
            "TINYINT" => Ok(HiveType::TinyInt),
            "SMALLINT" => Ok(HiveType::SmallInt),
            "INTEGER" => Ok(HiveType::Integer),
            "BIGINT" => Ok(HiveType::BigInt),
            "REAL" => Ok(HiveType::Real),
            "DOUBLE" => Ok(HiveType::Double),
            "VARCHAR" => Ok(HiveType::Varchar),
            "VARBINARY" => Ok(HiveType::Varbinary),
            "DATE" => Ok(HiveType::Date),
            "TIMESTAMP" => Ok(HiveType::Timestamp),
            other => Err(HiveSinkError::Deserialization(format!(
                "unknown hive type: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hive_type_names_round_trip() {
        let all = [
            HiveType::Boolean,
            HiveType::TinyInt,
            HiveType::SmallInt,
            HiveType::Integer,
            HiveType::BigInt,
            HiveType::Real,
            HiveType::Double,
            HiveType::Varchar,
            HiveType::Varbinary,
            HiveType::Date,
            HiveType::Timestamp,
        ];
        for ty in all {
            let parsed: HiveType = ty.name().parse().expect("parse rendered name");
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn unknown_hive_type_fails_deserialization() {
        let err = "STRUCT".parse::<HiveType>().expect_err("unknown type");
        assert!(matches!(err, HiveSinkError::Deserialization(_)));
    }

    #[test]
    fn arrow_compatibility_checks() {
        assert!(HiveType::Integer.matches_arrow(&DataType::Int32));
        assert!(!HiveType::Integer.matches_arrow(&DataType::Int64));
        assert!(HiveType::Varchar.matches_arrow(&DataType::LargeUtf8));
        assert!(
            HiveType::Timestamp
                .matches_arrow(&DataType::Timestamp(TimeUnit::Microsecond, None))
        );
        assert!(!HiveType::Timestamp.matches_arrow(&DataType::Timestamp(TimeUnit::Second, None)));
    }
}
