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

//! The per-object `uploads.json` registry of live upload IDs, and the
//! fan-out primitives maintaining it. The registry is edited on initiate,
//! complete and abort, always under the object-scoped multipart lock.

use bytes::Bytes;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::disk::error::{DiskError, Result};
use crate::disk::error_reduce::{reduce_read_quorum_errs, reduce_write_quorum_errs, OBJECT_OP_IGNORED_ERRS};
use crate::disk::{
    DeleteOptions, DiskAPI, DiskStore, MULTIPART_META_PREFIX, TMP_META_PREFIX, UPLOADS_JSON_FILE, XL_META_BUCKET,
};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct UploadInfo {
    #[serde(rename = "uploadID")]
    pub upload_id: String,
    pub initiated: OffsetDateTime,
}

/// Live upload IDs of one object, insertion ordered.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct UploadsIndex {
    pub uploads: Vec<UploadInfo>,
}

impl UploadsIndex {
    pub fn index_of(&self, upload_id: &str) -> Option<usize> {
        self.uploads.iter().position(|u| u.upload_id == upload_id)
    }

    /// Appends an upload ID; a second registration of the same ID is a no-op
    /// so the registry never holds duplicates.
    pub fn add(&mut self, upload_id: &str, initiated: OffsetDateTime) {
        if self.index_of(upload_id).is_some() {
            return;
        }
        self.uploads.push(UploadInfo {
            upload_id: upload_id.to_owned(),
            initiated,
        });
    }

    pub fn remove(&mut self, upload_id: &str) -> bool {
        match self.index_of(upload_id) {
            Some(idx) => {
                self.uploads.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

fn uploads_json_path(bucket: &str, object: &str) -> String {
    format!("{MULTIPART_META_PREFIX}/{bucket}/{object}/{UPLOADS_JSON_FILE}")
}

/// Quorum read of the registry.
pub async fn read_uploads_json(disks: &[Option<DiskStore>], bucket: &str, object: &str, read_quorum: usize) -> Result<UploadsIndex> {
    let path = uploads_json_path(bucket, object);

    let futures = disks.iter().map(|disk| {
        let path = path.clone();
        async move {
            match disk {
                Some(disk) => {
                    let data = disk.read_all(XL_META_BUCKET, &path).await?;
                    serde_json::from_slice::<UploadsIndex>(&data).map_err(DiskError::from)
                }
                None => Err(DiskError::DiskNotFound),
            }
        }
    });

    let mut indexes = Vec::with_capacity(disks.len());
    let mut errs = Vec::with_capacity(disks.len());
    for result in join_all(futures).await {
        match result {
            Ok(index) => {
                indexes.push(Some(index));
                errs.push(None);
            }
            Err(err) => {
                indexes.push(None);
                errs.push(Some(err));
            }
        }
    }

    if let Some(err) = reduce_read_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, read_quorum) {
        return Err(err);
    }

    indexes.into_iter().flatten().next().ok_or(DiskError::ErasureReadQuorum)
}

/// Writes the registry on every disk: staged under a fresh tmp directory,
/// then renamed into place. Succeeds on write quorum.
pub async fn write_uploads_json(
    disks: &[Option<DiskStore>],
    bucket: &str,
    object: &str,
    index: &UploadsIndex,
    write_quorum: usize,
) -> Result<()> {
    let dst_path = uploads_json_path(bucket, object);
    let tmp_path = format!("{TMP_META_PREFIX}/{}/{UPLOADS_JSON_FILE}", Uuid::new_v4());
    let data = Bytes::from(serde_json::to_vec(index)?);

    let futures = disks.iter().map(|disk| {
        let dst_path = dst_path.clone();
        let tmp_path = tmp_path.clone();
        let data = data.clone();
        async move {
            let disk = match disk {
                Some(disk) => disk,
                None => return Some(DiskError::DiskNotFound),
            };

            if let Err(err) = disk.write_all(XL_META_BUCKET, &tmp_path, data).await {
                return Some(err);
            }
            disk.rename_file(XL_META_BUCKET, &tmp_path, XL_META_BUCKET, &dst_path).await.err()
        }
    });

    let errs: Vec<Option<DiskError>> = join_all(futures).await;

    if let Some(err) = reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, write_quorum) {
        return Err(err);
    }

    Ok(())
}

/// Removes all traces of one upload: its directory under the multipart tree
/// and its staging area. Files already gone are not errors.
pub async fn cleanup_uploaded_parts(
    disks: &[Option<DiskStore>],
    bucket: &str,
    object: &str,
    upload_id: &str,
    write_quorum: usize,
) -> Result<()> {
    let upload_dir = format!("{MULTIPART_META_PREFIX}/{bucket}/{object}/{upload_id}");
    let tmp_dir = format!("{TMP_META_PREFIX}/{upload_id}");

    let futures = disks.iter().map(|disk| {
        let upload_dir = upload_dir.clone();
        let tmp_dir = tmp_dir.clone();
        async move {
            let disk = match disk {
                Some(disk) => disk,
                None => return Some(DiskError::DiskNotFound),
            };

            for dir in [upload_dir.as_str(), tmp_dir.as_str()] {
                match disk.delete(XL_META_BUCKET, dir, DeleteOptions { recursive: true }).await {
                    Ok(()) => {}
                    Err(DiskError::FileNotFound) => {}
                    Err(err) => return Some(err),
                }
            }
            None
        }
    });

    let errs: Vec<Option<DiskError>> = join_all(futures).await;

    if let Some(err) = reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, write_quorum) {
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_add_is_duplicate_free() {
        let mut index = UploadsIndex::default();
        index.add("u1", datetime!(2024-01-01 00:00 UTC));
        index.add("u2", datetime!(2024-01-01 00:01 UTC));
        index.add("u1", datetime!(2024-01-01 00:02 UTC));
        assert_eq!(index.uploads.len(), 2);
        assert_eq!(index.uploads[0].upload_id, "u1");
        assert_eq!(index.uploads[1].upload_id, "u2");
    }

    #[test]
    fn test_remove() {
        let mut index = UploadsIndex::default();
        index.add("u1", datetime!(2024-01-01 00:00 UTC));
        assert!(index.remove("u1"));
        assert!(!index.remove("u1"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut index = UploadsIndex::default();
        index.add("u1", datetime!(2024-01-01 00:00 UTC));
        let json: serde_json::Value = serde_json::from_slice(&serde_json::to_vec(&index).unwrap()).unwrap();
        assert_eq!(json["uploads"][0]["uploadID"], "u1");
    }
}
