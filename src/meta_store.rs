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

//! Quorum operations over the per-disk `xl.json` records: fan-out reads with
//! one result slot per disk, majority selection across diverging copies, and
//! the two-phase (stage under tmp, rename into place) write.

use bytes::Bytes;
use futures::future::join_all;
use time::OffsetDateTime;
use tracing::warn;

use crate::disk::error::{DiskError, Result};
use crate::disk::error_reduce::{reduce_read_quorum_errs, reduce_write_quorum_errs, OBJECT_OP_IGNORED_ERRS};
use crate::disk::{DiskAPI, DiskStore, XL_META_FILE};
use crate::filemeta::XlMeta;

/// Reads the `xl.json` under `dir` from every disk. Returns one record slot
/// and one error slot per disk, aligned with the input.
pub async fn read_all_xl_metadata(
    disks: &[Option<DiskStore>],
    volume: &str,
    dir: &str,
) -> (Vec<Option<XlMeta>>, Vec<Option<DiskError>>) {
    let path = format!("{dir}/{XL_META_FILE}");

    let futures = disks.iter().map(|disk| {
        let path = path.clone();
        async move {
            match disk {
                Some(disk) => {
                    let data = disk.read_all(volume, &path).await?;
                    XlMeta::from_bytes(&data).map_err(DiskError::from)
                }
                None => Err(DiskError::DiskNotFound),
            }
        }
    });

    let mut metas = Vec::with_capacity(disks.len());
    let mut errs = Vec::with_capacity(disks.len());

    for result in join_all(futures).await {
        match result {
            Ok(meta) => {
                metas.push(Some(meta));
                errs.push(None);
            }
            Err(err) => {
                metas.push(None);
                errs.push(Some(err));
            }
        }
    }

    (metas, errs)
}

/// Picks any readable, structurally valid record.
pub fn pick_valid_xl_meta(metas: &[Option<XlMeta>]) -> Result<XlMeta> {
    metas
        .iter()
        .flatten()
        .find(|m| m.is_valid())
        .cloned()
        .ok_or(DiskError::ErasureReadQuorum)
}

/// Splits the disk set by metadata agreement: the majority `{version,
/// modTime}` pair wins and its holders stay online; dissenting or unreadable
/// disks are dropped for the current operation only. Also returns
/// `higher_version`, one past the largest version seen anywhere.
pub fn list_online_disks(
    disks: &[Option<DiskStore>],
    metas: &[Option<XlMeta>],
    errs: &[Option<DiskError>],
) -> (Vec<Option<DiskStore>>, u64) {
    let mut higher_version = 1u64;
    let mut best_pair: Option<(u64, OffsetDateTime)> = None;
    let mut best_count = 0usize;

    for meta in metas.iter().flatten() {
        if meta.stat.version >= higher_version {
            higher_version = meta.stat.version + 1;
        }

        let pair = (meta.stat.version, meta.stat.mod_time);
        let count = metas
            .iter()
            .flatten()
            .filter(|m| (m.stat.version, m.stat.mod_time) == pair)
            .count();
        if count > best_count {
            best_count = count;
            best_pair = Some(pair);
        }
    }

    let online = disks
        .iter()
        .enumerate()
        .map(|(i, disk)| {
            if errs[i].is_some() {
                return None;
            }
            match (&metas[i], best_pair) {
                (Some(meta), Some(pair)) if (meta.stat.version, meta.stat.mod_time) == pair => disk.clone(),
                _ => None,
            }
        })
        .collect();

    (online, higher_version)
}

/// Stages one distinct record per disk under `dir` (each disk receives its
/// own copy, which may differ only in `erasure.checksum`). Slots with no
/// record or no disk are skipped; the write succeeds on quorum.
pub async fn write_unique_xl_metadata(
    disks: &[Option<DiskStore>],
    volume: &str,
    dir: &str,
    metas: &[Option<XlMeta>],
    write_quorum: usize,
) -> Result<()> {
    let path = format!("{dir}/{XL_META_FILE}");

    let futures = disks.iter().enumerate().map(|(i, disk)| {
        let path = path.clone();
        let meta = metas[i].clone();
        async move {
            let disk = match disk {
                Some(disk) => disk,
                None => return Some(DiskError::DiskNotFound),
            };
            let meta = match meta {
                Some(meta) => meta,
                None => return Some(DiskError::DiskNotFound),
            };

            let data = match meta.to_bytes() {
                Ok(data) => data,
                Err(err) => return Some(DiskError::from(err)),
            };

            disk.write_all(volume, &path, Bytes::from(data)).await.err()
        }
    });

    let errs: Vec<Option<DiskError>> = join_all(futures).await;

    if let Some(err) = reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, write_quorum) {
        warn!("staging xl.json under {volume}/{dir} failed: {err}, errs={errs:?}");
        return Err(err);
    }

    Ok(())
}

/// Fan-out rename of the staged `xl.json` into its live directory.
pub async fn rename_xl_metadata(
    disks: &[Option<DiskStore>],
    src_volume: &str,
    src_dir: &str,
    dst_volume: &str,
    dst_dir: &str,
    write_quorum: usize,
) -> Result<()> {
    let src_path = format!("{src_dir}/{XL_META_FILE}");
    let dst_path = format!("{dst_dir}/{XL_META_FILE}");

    let futures = disks.iter().map(|disk| {
        let src_path = src_path.clone();
        let dst_path = dst_path.clone();
        async move {
            match disk {
                Some(disk) => disk.rename_file(src_volume, &src_path, dst_volume, &dst_path).await.err(),
                None => Some(DiskError::DiskNotFound),
            }
        }
    });

    let errs: Vec<Option<DiskError>> = join_all(futures).await;

    if let Some(err) = reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, write_quorum) {
        return Err(err);
    }

    Ok(())
}

/// The quorum read of §4: read everywhere, distill the error vector, pick a
/// valid record. Surfaces `FileNotFound` when a majority agrees the record
/// does not exist.
pub async fn read_xl_metadata_quorum(
    disks: &[Option<DiskStore>],
    volume: &str,
    dir: &str,
    read_quorum: usize,
) -> Result<XlMeta> {
    let (metas, errs) = read_all_xl_metadata(disks, volume, dir).await;

    if let Some(err) = reduce_read_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, read_quorum) {
        return Err(err);
    }

    pick_valid_xl_meta(&metas)
}
