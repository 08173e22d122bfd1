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

use bytes::Bytes;
use futures::future::join_all;
use sha2::{Digest, Sha512};
use tracing::warn;

use crate::disk::error::{DiskError, Result};
use crate::disk::error_reduce::{reduce_write_quorum_errs, OBJECT_OP_IGNORED_ERRS};
use crate::disk::{DiskAPI, DiskStore};

use super::erasure::Erasure;

/// Streams erasure-coded stripes of one part file across a disk set.
///
/// Shard `k` of every stripe goes to disk `i` where `distribution[i] - 1 ==
/// k`, and is fed into hasher `k`. A disk that fails a write is dropped from
/// the set for the remainder of the part; the append only fails once fewer
/// than `write_quorum` disks remain.
pub struct ErasureWriter {
    erasure: Erasure,
    disks: Vec<Option<DiskStore>>,
    distribution: Vec<usize>,
    volume: String,
    path: String,
    hashers: Vec<Sha512>,
    errs: Vec<Option<DiskError>>,
    write_quorum: usize,
}

impl ErasureWriter {
    /// Truncates any stale staged file and materializes an empty shard file
    /// on every available disk, so that a zero-byte part still commits.
    pub async fn create(
        disks: &[Option<DiskStore>],
        erasure: Erasure,
        distribution: Vec<usize>,
        volume: &str,
        path: &str,
        write_quorum: usize,
    ) -> Result<Self> {
        let total = erasure.total_shard_count();
        let mut writer = ErasureWriter {
            erasure,
            disks: disks.to_vec(),
            distribution,
            volume: volume.to_owned(),
            path: path.to_owned(),
            hashers: (0..total).map(|_| Sha512::new()).collect(),
            errs: vec![None; disks.len()],
            write_quorum,
        };

        let futures = writer.disks.iter().map(|disk| {
            let volume = writer.volume.clone();
            let path = writer.path.clone();
            async move {
                match disk {
                    Some(disk) => disk.write_all(&volume, &path, Bytes::new()).await,
                    None => Err(DiskError::DiskNotFound),
                }
            }
        });

        let results = join_all(futures).await;
        for (i, res) in results.into_iter().enumerate() {
            if let Err(err) = res {
                writer.errs[i] = Some(err);
                writer.disks[i] = None;
            }
        }

        writer.check_quorum()?;

        Ok(writer)
    }

    fn check_quorum(&self) -> Result<()> {
        let online = self.errs.iter().filter(|e| e.is_none()).count();
        if online >= self.write_quorum {
            return Ok(());
        }

        Err(reduce_write_quorum_errs(&self.errs, OBJECT_OP_IGNORED_ERRS, self.write_quorum)
            .unwrap_or(DiskError::ErasureWriteQuorum))
    }

    /// Encodes `buf` as one stripe and appends each shard to its disk.
    /// Returns the number of input bytes consumed, always `buf.len()` on
    /// success.
    pub async fn append(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let shards = self.erasure.encode_data(buf).map_err(DiskError::from)?;

        for (k, shard) in shards.iter().enumerate() {
            self.hashers[k].update(shard);
        }

        let futures = self.disks.iter().enumerate().map(|(i, disk)| {
            let shard = shards[self.distribution[i] - 1].clone();
            let volume = self.volume.clone();
            let path = self.path.clone();
            let had_err = self.errs[i].is_some();
            async move {
                if had_err {
                    return None;
                }
                match disk {
                    Some(disk) => match disk.append_file(&volume, &path, &shard).await {
                        Ok(n) if n != shard.len() => Some(DiskError::ShortWrite),
                        Ok(_) => None,
                        Err(err) => Some(err),
                    },
                    None => Some(DiskError::DiskNotFound),
                }
            }
        });

        let results = join_all(futures).await;
        for (i, res) in results.into_iter().enumerate() {
            if let Some(err) = res {
                if self.errs[i].is_none() {
                    warn!("shard append failed on disk {}: {}", i, err);
                    self.errs[i] = Some(err);
                    self.disks[i] = None;
                }
            }
        }

        self.check_quorum()?;

        Ok(buf.len())
    }

    /// Disk slots that accepted every shard write so far.
    pub fn online_disks(&self) -> Vec<Option<DiskStore>> {
        self.disks.clone()
    }

    /// Finalizes the per-shard digests, hex-encoded, indexed by shard.
    pub fn finish(self) -> Vec<String> {
        self.hashers
            .into_iter()
            .map(|h| faster_hex::hex_string(h.finalize().as_slice()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::disk::{DiskAPI, LocalDisk};

    async fn disk_set(dir: &tempfile::TempDir, n: usize) -> Vec<Option<DiskStore>> {
        let mut disks = Vec::with_capacity(n);
        for i in 0..n {
            let disk = LocalDisk::new(dir.path().join(format!("disk{i}"))).await.unwrap();
            disk.make_volume("vol").await.unwrap();
            disks.push(Some(Arc::new(disk) as DiskStore));
        }
        disks
    }

    #[tokio::test]
    async fn test_append_writes_each_shard_once() {
        let dir = tempfile::tempdir().unwrap();
        let disks = disk_set(&dir, 6).await;
        let distribution: Vec<usize> = (1..=6).collect();

        let mut writer = ErasureWriter::create(&disks, Erasure::new(4, 2, 1024), distribution, "vol", "part", 4)
            .await
            .unwrap();

        let data = vec![3u8; 1000];
        assert_eq!(writer.append(&data).await.unwrap(), 1000);

        let hashes = writer.finish();
        assert_eq!(hashes.len(), 6);

        let shard_len = super::super::erasure::calc_shard_size(1000, 4);
        for disk in disks.iter().flatten() {
            assert_eq!(disk.stat_file("vol", "part").await.unwrap().size, shard_len as u64);
        }
    }

    #[tokio::test]
    async fn test_zero_byte_part_materializes_files() {
        let dir = tempfile::tempdir().unwrap();
        let disks = disk_set(&dir, 6).await;
        let distribution: Vec<usize> = (1..=6).collect();

        let writer = ErasureWriter::create(&disks, Erasure::new(4, 2, 1024), distribution, "vol", "part", 4)
            .await
            .unwrap();
        drop(writer);

        for disk in disks.iter().flatten() {
            assert_eq!(disk.stat_file("vol", "part").await.unwrap().size, 0);
        }
    }

    #[tokio::test]
    async fn test_offline_disks_below_quorum_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut disks = disk_set(&dir, 6).await;
        for slot in disks.iter_mut().take(3) {
            *slot = None;
        }
        let distribution: Vec<usize> = (1..=6).collect();

        let res = ErasureWriter::create(&disks, Erasure::new(4, 2, 1024), distribution, "vol", "part", 4).await;
        assert!(res.is_err());
    }
}
