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
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sort_flush_batch_rows() -> usize {
    4_096
}

/// Tuning knobs for the hive write path. Loaded from TOML when the embedding
/// process ships a config file; everything has a serde default so the sink
/// also works with `HiveSinkConfig::default()`.
#[derive(Clone, Debug, Deserialize)]
pub struct HiveSinkConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional full tracing EnvFilter expression.
    /// If set, this takes precedence over `log_level`.
    /// Example: "hivesink=debug,parquet=off"
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Rows per batch handed to a destination writer when flushing a sorted
    /// buffer at commit time.
    #[serde(default = "default_sort_flush_batch_rows")]
    pub sort_flush_batch_rows: usize,
}

impl Default for HiveSinkConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_filter: None,
            sort_flush_batch_rows: default_sort_flush_batch_rows(),
        }
    }
}

impl HiveSinkConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let cfg: Self = toml::from_str(&raw)
            .with_context(|| format!("parse config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Resolve from `$HIVESINK_CONFIG`, then `./hivesink.toml`, falling back
    /// to built-in defaults when neither exists.
    pub fn from_env_or_default() -> Result<Self> {
        if let Ok(p) = std::env::var("HIVESINK_CONFIG") {
            if !p.trim().is_empty() {
                return Self::load_from_file(p.trim());
            }
        }
        let local = Path::new("hivesink.toml");
        if local.exists() {
            return Self::load_from_file(local);
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::HiveSinkConfig;

    #[test]
    fn default_config_has_sane_knobs() {
        let cfg = HiveSinkConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.log_filter.is_none());
        assert_eq!(cfg.sort_flush_batch_rows, 4_096);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: HiveSinkConfig = toml::from_str("log_level = \"debug\"").expect("parse");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.sort_flush_batch_rows, 4_096);
    }

    #[test]
    fn full_toml_overrides_everything() {
        let raw = r#"
log_level = "warn"
log_filter = "hivesink=trace"
sort_flush_batch_rows = 128
"#;
        let cfg: HiveSinkConfig = toml::from_str(raw).expect("parse");
        assert_eq!(cfg.log_filter.as_deref(), Some("hivesink=trace"));
        assert_eq!(cfg.sort_flush_batch_rows, 128);
    }
}
