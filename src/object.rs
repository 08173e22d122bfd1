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

//! Bucket management and the committed-object read path.

use futures::future::join_all;
use tokio::io::AsyncWrite;
use tracing::warn;

use crate::bucket::utils::{check_get_object_args, is_valid_bucket_name};
use crate::disk::error::DiskError;
use crate::disk::error_reduce::{
    count_errs, reduce_read_quorum_errs, reduce_write_quorum_errs, BUCKET_OP_IGNORED_ERRS, OBJECT_OP_IGNORED_ERRS,
};
use crate::disk::{DiskAPI, XL_META_FILE};
use crate::erasure_coding::{bitrot_sha512_hex, decode_stripes, Erasure};
use crate::error::{to_object_err, Result, StorageError};
use crate::meta_store::{pick_valid_xl_meta, read_all_xl_metadata};
use crate::multipart::XlObjects;
use crate::store_api::ObjectInfo;

impl XlObjects {
    /// Creates a bucket on a quorum of disks.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn make_bucket(&self, bucket: &str) -> Result<()> {
        if !is_valid_bucket_name(bucket) {
            return Err(StorageError::BucketNameInvalid(bucket.to_owned()));
        }

        let futures = self.disks.iter().map(|disk| async move {
            match disk {
                Some(disk) => disk.make_volume(bucket).await.err(),
                None => Some(DiskError::DiskNotFound),
            }
        });

        let errs: Vec<Option<DiskError>> = join_all(futures).await;

        if count_errs(&errs, &DiskError::VolumeExists) >= self.write_quorum() {
            return Err(StorageError::BucketExists(bucket.to_owned()));
        }

        if let Some(err) = reduce_write_quorum_errs(&errs, BUCKET_OP_IGNORED_ERRS, self.write_quorum()) {
            return Err(to_object_err(err, &[bucket]));
        }

        Ok(())
    }

    pub async fn is_bucket_exist(&self, bucket: &str) -> bool {
        let futures = self.disks.iter().map(|disk| async move {
            match disk {
                Some(disk) => disk.stat_volume(bucket).await.is_ok(),
                None => false,
            }
        });

        let found = join_all(futures).await.into_iter().filter(|ok| *ok).count();
        found >= self.read_quorum()
    }

    /// True when a committed object lives exactly at `prefix`.
    pub(crate) async fn is_object(&self, bucket: &str, prefix: &str) -> bool {
        let path = format!("{prefix}/{XL_META_FILE}");
        let futures = self.disks.iter().map(|disk| {
            let path = path.clone();
            async move {
                match disk {
                    Some(disk) => disk.stat_file(bucket, &path).await.is_ok(),
                    None => false,
                }
            }
        });

        let found = join_all(futures).await.into_iter().filter(|ok| *ok).count();
        found >= self.read_quorum()
    }

    /// True when any parent prefix of `object` is itself a committed object,
    /// which would make the object path unusable.
    pub(crate) async fn parent_dir_is_object(&self, bucket: &str, object: &str) -> bool {
        let mut prefix = object;
        while let Some(idx) = prefix.rfind('/') {
            prefix = &prefix[..idx];
            if self.is_object(bucket, prefix).await {
                return true;
            }
        }
        false
    }

    /// Removes a committed object from all disks.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete_object(&self, bucket: &str, object: &str) -> Result<()> {
        check_get_object_args(bucket, object)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        let _guard = self.ns_lock.lock(bucket, object).await;

        if !self.is_object(bucket, object).await {
            return Err(StorageError::ObjectNotFound(bucket.to_owned(), object.to_owned()));
        }

        let futures = self.disks.iter().map(|disk| async move {
            match disk {
                Some(disk) => disk
                    .delete(bucket, object, crate::disk::DeleteOptions { recursive: true })
                    .await
                    .err(),
                None => Some(DiskError::DiskNotFound),
            }
        });

        let errs: Vec<Option<DiskError>> = join_all(futures).await;
        if let Some(err) = reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, self.write_quorum()) {
            return Err(to_object_err(err, &[bucket, object]));
        }

        Ok(())
    }

    /// Streams a committed object's payload into `writer`: the ordered
    /// concatenation of its parts, each decoded from the disks' shard files.
    /// Shards failing their bitrot check are treated as lost and rebuilt.
    #[tracing::instrument(level = "debug", skip(self, writer))]
    pub async fn get_object<W>(&self, bucket: &str, object: &str, writer: &mut W) -> Result<ObjectInfo>
    where
        W: AsyncWrite + Unpin + Send,
    {
        check_get_object_args(bucket, object)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        let _guard = self.ns_lock.lock(bucket, object).await;

        let (metas, errs) = read_all_xl_metadata(&self.disks, bucket, object).await;
        if let Some(err) = reduce_read_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, self.read_quorum()) {
            return Err(to_object_err(err, &[bucket, object]));
        }

        let xl_meta = pick_valid_xl_meta(&metas).map_err(|err| to_object_err(err, &[bucket, object]))?;
        let erasure = Erasure::new(xl_meta.erasure.data_blocks, xl_meta.erasure.parity_blocks, xl_meta.erasure.block_size);

        for part in xl_meta.parts.iter() {
            let part_path = format!("{object}/{}", part.name);
            let expected_len = erasure.shard_file_size(part.size);

            let futures = self.disks.iter().enumerate().map(|(i, disk)| {
                let part_path = part_path.clone();
                let part_name = part.name.clone();
                let meta = metas[i].clone();
                async move {
                    let disk = disk.as_ref()?;
                    let meta = meta?;

                    let data = match disk.read_all(bucket, &part_path).await {
                        Ok(data) => data,
                        Err(err) => {
                            warn!("shard of {} unreadable on {}: {}", part_path, disk.to_string(), err);
                            return None;
                        }
                    };

                    if data.len() as u64 != expected_len {
                        warn!("shard of {} truncated on {}", part_path, disk.to_string());
                        return None;
                    }

                    match meta.erasure.checksum_of(&part_name) {
                        Some(checksum) if checksum.hash == bitrot_sha512_hex(&data) => {}
                        _ => {
                            warn!("bitrot detected in {} on {}", part_path, disk.to_string());
                            return None;
                        }
                    }

                    Some((meta.erasure.shard_index(i), data.to_vec()))
                }
            });

            let mut shard_files: Vec<Option<Vec<u8>>> = vec![None; erasure.total_shard_count()];
            for result in join_all(futures).await.into_iter().flatten() {
                let (shard_index, data) = result;
                shard_files[shard_index] = Some(data);
            }

            decode_stripes(&erasure, &shard_files, part.size, writer)
                .await
                .map_err(|err| to_object_err(err, &[bucket, object]))?;
        }

        Ok(ObjectInfo {
            bucket: bucket.to_owned(),
            name: object.to_owned(),
            size: xl_meta.stat.size,
            mod_time: Some(xl_meta.stat.mod_time),
            etag: xl_meta.meta.get("md5Sum").cloned(),
            content_type: xl_meta.meta.get("content-type").cloned(),
        })
    }
}
