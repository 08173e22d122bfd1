// Copyright 2025 xlstore Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `xl.json` metadata record. One copy lives on every disk next to the
//! shard files it describes; all copies of a healthy object agree on `stat`,
//! `meta` and `parts`, while `erasure.checksum` differs per disk (each disk
//! records only the digests of the shards it holds).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::erasure_coding::BITROT_ALGORITHM;

/// Format version of the record itself.
pub const XL_META_FORMAT_VERSION: u32 = 1;

pub const ERASURE_ALGORITHM: &str = "reedsolomon";

/// One uploaded part as tracked by the metadata record.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ObjectPartInfo {
    pub number: usize,
    pub name: String,
    pub etag: String,
    pub size: u64,
}

/// Bitrot digest of one shard file, scoped to the disk holding the record.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ChecksumInfo {
    pub name: String,
    pub algorithm: String,
    pub hash: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErasureInfo {
    pub algorithm: String,
    pub data_blocks: usize,
    pub parity_blocks: usize,
    pub block_size: usize,
    /// `distribution[i]` is the 1-based shard index held by disk `i`;
    /// a permutation of `1..=dataBlocks+parityBlocks`, frozen at initiate.
    pub distribution: Vec<usize>,
    #[serde(rename = "checksum")]
    pub checksums: Vec<ChecksumInfo>,
}

impl ErasureInfo {
    pub fn shard_index(&self, disk_index: usize) -> usize {
        self.distribution[disk_index] - 1
    }

    pub fn checksum_of(&self, part_name: &str) -> Option<&ChecksumInfo> {
        self.checksums.iter().find(|c| c.name == part_name)
    }

    /// Records the digest of `part_name`, replacing any prior entry so a
    /// re-uploaded part keeps a single checksum.
    pub fn set_checksum(&mut self, part_name: &str, hash: String) {
        let info = ChecksumInfo {
            name: part_name.to_owned(),
            algorithm: BITROT_ALGORITHM.to_owned(),
            hash,
        };
        match self.checksums.iter_mut().find(|c| c.name == part_name) {
            Some(slot) => *slot = info,
            None => self.checksums.push(info),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct XlStat {
    pub size: u64,
    pub mod_time: OffsetDateTime,
    /// Monotonically non-decreasing across successive writes of the record.
    pub version: u64,
}

impl Default for XlStat {
    fn default() -> Self {
        XlStat {
            size: 0,
            mod_time: OffsetDateTime::UNIX_EPOCH,
            version: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct XlMeta {
    pub version: u32,
    pub stat: XlStat,
    pub erasure: ErasureInfo,
    pub meta: HashMap<String, String>,
    pub parts: Vec<ObjectPartInfo>,
}

/// Deterministic shard placement for `key`: a rotation of `1..=cardinality`
/// anchored by the key's crc32, so placement is stable for the lifetime of
/// an upload without any coordination.
pub fn hashed_distribution(key: &str, cardinality: usize) -> Vec<usize> {
    let mut nums = vec![0; cardinality];
    let key_crc = crc32fast::hash(key.as_bytes());

    let start = key_crc as usize % cardinality;
    for i in 1..=cardinality {
        nums[i - 1] = 1 + ((start + i) % cardinality);
    }

    nums
}

impl XlMeta {
    pub fn new(key: &str, data_blocks: usize, parity_blocks: usize, block_size: usize, mod_time: OffsetDateTime) -> Self {
        XlMeta {
            version: XL_META_FORMAT_VERSION,
            stat: XlStat {
                size: 0,
                mod_time,
                version: 1,
            },
            erasure: ErasureInfo {
                algorithm: ERASURE_ALGORITHM.to_owned(),
                data_blocks,
                parity_blocks,
                block_size,
                distribution: hashed_distribution(key, data_blocks + parity_blocks),
                checksums: Vec::new(),
            },
            meta: HashMap::new(),
            parts: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        let data_blocks = self.erasure.data_blocks;
        let parity_blocks = self.erasure.parity_blocks;

        data_blocks > 0
            && data_blocks >= parity_blocks
            && self.erasure.distribution.len() == data_blocks + parity_blocks
    }

    pub fn object_part_index(&self, number: usize) -> Option<usize> {
        self.parts.iter().position(|p| p.number == number)
    }

    /// Adds a part entry, replacing a previous upload of the same number.
    /// `parts` stays sorted by part number.
    pub fn add_object_part(&mut self, number: usize, name: String, etag: String, size: u64) {
        let part = ObjectPartInfo {
            number,
            name,
            etag,
            size,
        };

        match self.object_part_index(number) {
            Some(idx) => self.parts[idx] = part,
            None => {
                self.parts.push(part);
                self.parts.sort_by_key(|p| p.number);
            }
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

/// On-disk name of a part file within an upload or object directory.
pub fn part_name(number: usize) -> String {
    format!("object{number}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_distribution_is_permutation() {
        for key in ["a", "upload-3c2f", "another/key"] {
            for n in [1usize, 4, 6, 16] {
                let mut dist = hashed_distribution(key, n);
                assert_eq!(dist, hashed_distribution(key, n));
                dist.sort();
                assert_eq!(dist, (1..=n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_add_object_part_replaces_and_sorts() {
        let mut meta = XlMeta::new("k", 4, 2, 1024, datetime!(2024-01-01 00:00 UTC));
        meta.add_object_part(3, part_name(3), "e3".into(), 30);
        meta.add_object_part(1, part_name(1), "e1".into(), 10);
        meta.add_object_part(2, part_name(2), "e2".into(), 20);
        assert_eq!(meta.parts.iter().map(|p| p.number).collect::<Vec<_>>(), vec![1, 2, 3]);

        meta.add_object_part(2, part_name(2), "e2b".into(), 25);
        assert_eq!(meta.parts.len(), 3);
        assert_eq!(meta.parts[1].etag, "e2b");
        assert_eq!(meta.parts[1].size, 25);
    }

    #[test]
    fn test_checksum_replace() {
        let mut erasure = ErasureInfo::default();
        erasure.set_checksum("object1", "aa".into());
        erasure.set_checksum("object2", "bb".into());
        erasure.set_checksum("object1", "cc".into());
        assert_eq!(erasure.checksums.len(), 2);
        assert_eq!(erasure.checksum_of("object1").unwrap().hash, "cc");
    }

    #[test]
    fn test_json_roundtrip() {
        let mut meta = XlMeta::new("k", 4, 2, 4 * 1024 * 1024, datetime!(2024-06-01 12:30 UTC));
        meta.meta.insert("content-type".into(), "text/plain".into());
        meta.add_object_part(1, part_name(1), "e1".into(), 7);
        meta.erasure.set_checksum(&part_name(1), "deadbeef".into());

        let data = meta.to_bytes().unwrap();
        let parsed = XlMeta::from_bytes(&data).unwrap();
        assert_eq!(parsed, meta);

        let json: serde_json::Value = serde_json::from_slice(&data).unwrap();
        assert!(json["erasure"]["dataBlocks"].is_number());
        assert!(json["stat"]["modTime"].is_string());
        assert!(json["erasure"]["checksum"].is_array());
    }
}
