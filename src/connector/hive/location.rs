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

//! Pure partition/bucket path construction. Everything here is deterministic:
//! the same (partition key, bucket id, base name) always yields the same
//! relative path, and distinct destinations yield distinct paths.

/// Partition value written for NULL partition keys, per the Hive convention.
pub const DEFAULT_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

// Characters Hive escapes in partition path segments, besides ASCII control
// characters and DEL.
const ESCAPED: &[char] = &[
    '"', '#', '%', '\'', '*', '/', ':', '=', '?', '\\', '{', '[', ']', '^',
];

/// Percent-escape a partition name or value so it is safe as one path
/// segment component.
pub fn escape_path_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch < ' ' || ch == '\u{7F}' || ESCAPED.contains(&ch) {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// `name=value` segments joined by `/`, each component escaped.
pub fn partition_subdirectory(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", escape_path_name(name), escape_path_name(value)))
        .collect::<Vec<_>>()
        .join("/")
}

/// Width of the zero-padded bucket suffix: enough decimal digits to cover the
/// maximum bucket id.
pub fn bucket_suffix_width(bucket_count: u32) -> usize {
    bucket_count.saturating_sub(1).max(1).ilog10() as usize + 1
}

/// File name for one destination. Bucketed tables get a `_<id>` suffix padded
/// to [`bucket_suffix_width`]; unbucketed tables get the bare base name.
pub fn file_name(base: &str, bucket: Option<(u32, u32)>, extension: &str) -> String {
    match bucket {
        Some((bucket_id, bucket_count)) => {
            let width = bucket_suffix_width(bucket_count);
            format!("{base}_{bucket_id:0width$}.{extension}")
        }
        None => format!("{base}.{extension}"),
    }
}

/// Relative path of a destination file under the table's output directory.
pub fn build_relative_path(partition: Option<&str>, file_name: &str) -> String {
    match partition {
        Some(partition) if !partition.is_empty() => format!("{partition}/{file_name}"),
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_keeps_plain_names() {
        assert_eq!(escape_path_name("ds-2024_01.x"), "ds-2024_01.x");
    }

    #[test]
    fn escape_encodes_reserved_characters() {
        assert_eq!(escape_path_name("a/b"), "a%2Fb");
        assert_eq!(escape_path_name("k=v"), "k%3Dv");
        assert_eq!(escape_path_name("100%"), "100%25");
        assert_eq!(escape_path_name("tab\there"), "tab%09here");
    }

    #[test]
    fn partition_subdirectory_joins_escaped_segments() {
        let pairs = vec![
            ("ds".to_string(), "2024-01-01".to_string()),
            ("region".to_string(), "us/east".to_string()),
        ];
        assert_eq!(
            partition_subdirectory(&pairs),
            "ds=2024-01-01/region=us%2Feast"
        );
    }

    #[test]
    fn bucket_suffix_width_covers_max_id() {
        assert_eq!(bucket_suffix_width(1), 1);
        assert_eq!(bucket_suffix_width(4), 1);
        assert_eq!(bucket_suffix_width(10), 1);
        assert_eq!(bucket_suffix_width(11), 2);
        assert_eq!(bucket_suffix_width(100), 2);
        assert_eq!(bucket_suffix_width(101), 3);
    }

    #[test]
    fn file_names_carry_padded_bucket_suffix() {
        assert_eq!(file_name("base", None, "parquet"), "base.parquet");
        assert_eq!(file_name("base", Some((3, 4)), "parquet"), "base_3.parquet");
        assert_eq!(
            file_name("base", Some((7, 128)), "parquet"),
            "base_007.parquet"
        );
    }

    #[test]
    fn relative_paths_compose_partition_and_file() {
        assert_eq!(build_relative_path(None, "f.parquet"), "f.parquet");
        assert_eq!(
            build_relative_path(Some("ds=2024-01-01"), "f.parquet"),
            "ds=2024-01-01/f.parquet"
        );
    }

    #[test]
    fn distinct_destinations_get_distinct_paths() {
        let a = build_relative_path(Some("ds=1"), &file_name("b", Some((0, 4)), "parquet"));
        let b = build_relative_path(Some("ds=1"), &file_name("b", Some((1, 4)), "parquet"));
        let c = build_relative_path(Some("ds=2"), &file_name("b", Some((0, 4)), "parquet"));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
