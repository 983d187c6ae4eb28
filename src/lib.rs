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
pub mod common;
pub mod connector;
pub mod error;
pub mod formats;

pub use common::config as hivesink_config;
pub use common::logging as hivesink_logging;
pub use common::types::UniqueId;
pub use connector::hive as hive_connector;
pub use connector::hive::{
    CommitStrategy, HiveBucketKind, HiveBucketProperty, HiveDataSink, HiveInsertTableHandle,
    HivePartitionUpdate, HiveSinkContext, HiveSortingColumn, HiveType, SortOrder,
};
pub use error::{HiveSinkError, Result};
pub use formats::{
    CompressionKind, FileFormat, FileWriteResult, FileWriter, FileWriterFactory, writer_factory,
};
