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
use thiserror::Error;

/// Errors surfaced by the hive write path. The message strings for argument
/// and lifecycle violations are part of the public contract; callers match
/// on them.
#[derive(Debug, Error)]
pub enum HiveSinkError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Deserialization(String),

    #[error("sink has been closed")]
    SinkClosed,

    #[error("sink has been aborted")]
    SinkAborted,

    #[error("{0}")]
    InvalidState(String),

    #[error("write target already exists: {0}")]
    FileConflict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T, E = HiveSinkError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_messages_are_stable() {
        assert_eq!(HiveSinkError::SinkClosed.to_string(), "sink has been closed");
        assert_eq!(
            HiveSinkError::SinkAborted.to_string(),
            "sink has been aborted"
        );
        assert_eq!(
            HiveSinkError::InvalidState("can't abort a closed sink".to_string()).to_string(),
            "can't abort a closed sink"
        );
    }

    #[test]
    fn io_errors_convert() {
        let err: HiveSinkError = std::io::Error::other("disk full").into();
        assert!(matches!(err, HiveSinkError::Io(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
