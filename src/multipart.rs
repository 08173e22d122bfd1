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

//! The multipart upload coordinator: initiate, append parts, list, complete,
//! abort. Every durable change is staged under `tmp/<uploadID>` and flipped
//! into place by rename; concurrent callers are serialized by named locks
//! over the affected paths.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use md5::{Digest as Md5Digest, Md5};
use tokio::io::AsyncRead;
use tracing::warn;
use uuid::Uuid;

use crate::bucket::utils::{
    check_abort_multipart_args, check_complete_multipart_args, check_list_multipart_args, check_list_parts_args,
    check_new_multipart_args, check_put_object_part_args,
};
use crate::disk::error::DiskError;
use crate::disk::error_reduce::{reduce_read_quorum_errs, reduce_write_quorum_errs, OBJECT_OP_IGNORED_ERRS};
use crate::disk::{
    DeleteOptions, DiskAPI, DiskStore, MULTIPART_META_PREFIX, SLASH_SEPARATOR, TMP_META_PREFIX, XL_META_BUCKET,
};
use crate::erasure_coding::{Erasure, ErasureWriter};
use crate::error::{to_object_err, Result, StorageError};
use crate::filemeta::{part_name, ObjectPartInfo, XlMeta};
use crate::meta_store::{
    list_online_disks, pick_valid_xl_meta, read_all_xl_metadata, read_xl_metadata_quorum, rename_xl_metadata,
    write_unique_xl_metadata,
};
use crate::namespace_lock::{Locker, NsLockMap};
use crate::store_api::{Clock, CompletePart, ListMultipartsInfo, ListPartsInfo, MultipartInfo, PartInfo, SystemClock};
use crate::store_utils::{content_type_of, get_complete_multipart_md5, is_min_allowed_part_size, read_full, MIN_PART_SIZE};
use crate::uploads::{cleanup_uploaded_parts, read_uploads_json, write_uploads_json};

/// Streaming buffer size; one buffer fill forms one erasure stripe.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;
/// Cap on the number of parts returned by one listing call.
pub const MAX_PARTS_LIST: usize = 1000;
/// Largest part number a client may use.
pub const MAX_PARTS_COUNT: usize = 10000;

/// The erasure-coded object store over a fixed, ordered disk set.
///
/// `data_blocks + parity_blocks` always equals the disk count; both are
/// frozen at construction. The lock service and clock are injected.
pub struct XlObjects {
    pub(crate) disks: Vec<Option<DiskStore>>,
    pub(crate) data_blocks: usize,
    pub(crate) parity_blocks: usize,
    pub(crate) ns_lock: Arc<dyn Locker>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl XlObjects {
    pub async fn new(disks: Vec<Option<DiskStore>>, data_blocks: usize, parity_blocks: usize) -> Result<Self> {
        Self::with_services(disks, data_blocks, parity_blocks, Arc::new(NsLockMap::new()), Arc::new(SystemClock)).await
    }

    pub async fn with_services(
        disks: Vec<Option<DiskStore>>,
        data_blocks: usize,
        parity_blocks: usize,
        ns_lock: Arc<dyn Locker>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if data_blocks == 0 || parity_blocks == 0 || data_blocks < parity_blocks {
            return Err(StorageError::other("invalid data/parity block counts"));
        }
        if data_blocks + parity_blocks != disks.len() {
            return Err(StorageError::other("disk count does not match data + parity blocks"));
        }

        let store = XlObjects {
            disks,
            data_blocks,
            parity_blocks,
            ns_lock,
            clock,
        };

        for disk in store.disks.iter().flatten() {
            match disk.make_volume(XL_META_BUCKET).await {
                Ok(()) | Err(DiskError::VolumeExists) => {}
                Err(err) => return Err(to_object_err(err, &[XL_META_BUCKET])),
            }
        }

        Ok(store)
    }

    pub(crate) fn read_quorum(&self) -> usize {
        self.disks.len() / 2 + 1
    }

    pub(crate) fn write_quorum(&self) -> usize {
        self.disks.len() / 2 + 1
    }

    pub(crate) fn multipart_dir(bucket: &str, object: &str) -> String {
        format!("{MULTIPART_META_PREFIX}/{bucket}/{object}")
    }

    pub(crate) fn upload_id_dir(bucket: &str, object: &str, upload_id: &str) -> String {
        format!("{MULTIPART_META_PREFIX}/{bucket}/{object}/{upload_id}")
    }

    pub(crate) fn tmp_dir(upload_id: &str) -> String {
        format!("{TMP_META_PREFIX}/{upload_id}")
    }

    async fn is_upload_id_exists(&self, bucket: &str, object: &str, upload_id: &str) -> bool {
        let dir = Self::upload_id_dir(bucket, object, upload_id);
        read_xl_metadata_quorum(&self.disks, XL_META_BUCKET, &dir, self.read_quorum()).await.is_ok()
    }

    /// Fan-out recursive delete; paths already gone are not errors.
    pub(crate) async fn delete_all(&self, volume: &str, path: &str) -> core::result::Result<(), DiskError> {
        let futures = self.disks.iter().map(|disk| async move {
            match disk {
                Some(disk) => match disk.delete(volume, path, DeleteOptions { recursive: true }).await {
                    Ok(()) | Err(DiskError::FileNotFound) => None,
                    Err(err) => Some(err),
                },
                None => Some(DiskError::DiskNotFound),
            }
        });

        let errs: Vec<Option<DiskError>> = join_all(futures).await;
        match reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, self.write_quorum()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Fan-out directory rename with quorum; the commit primitive.
    pub(crate) async fn rename_object_dir(
        &self,
        disks: &[Option<DiskStore>],
        src_volume: &str,
        src_dir: &str,
        dst_volume: &str,
        dst_dir: &str,
    ) -> core::result::Result<(), DiskError> {
        let src = format!("{src_dir}{SLASH_SEPARATOR}");
        let dst = format!("{dst_dir}{SLASH_SEPARATOR}");

        let futures = disks.iter().map(|disk| {
            let src = src.clone();
            let dst = dst.clone();
            async move {
                match disk {
                    Some(disk) => disk.rename_file(src_volume, &src, dst_volume, &dst).await.err(),
                    None => Some(DiskError::DiskNotFound),
                }
            }
        });

        let errs: Vec<Option<DiskError>> = join_all(futures).await;
        match reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, self.write_quorum()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rename_part_file(
        &self,
        disks: &[Option<DiskStore>],
        src_path: &str,
        dst_path: &str,
    ) -> core::result::Result<(), DiskError> {
        let futures = disks.iter().map(|disk| async move {
            match disk {
                Some(disk) => disk.rename_file(XL_META_BUCKET, src_path, XL_META_BUCKET, dst_path).await.err(),
                None => Some(DiskError::DiskNotFound),
            }
        });

        let errs: Vec<Option<DiskError>> = join_all(futures).await;
        match reduce_write_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, self.write_quorum()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Stat of one part file from any disk currently holding it.
    async fn stat_part(&self, part_path: &str) -> core::result::Result<crate::disk::FileInfo, DiskError> {
        let mut last_err = DiskError::DiskNotFound;
        for disk in self.disks.iter().flatten() {
            match disk.stat_file(XL_META_BUCKET, part_path).await {
                Ok(fi) => return Ok(fi),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    /// Deletes one part file of an upload everywhere, tolerating absence.
    async fn remove_object_part(&self, bucket: &str, object: &str, upload_id: &str, name: &str) {
        let path = format!("{}/{}", Self::upload_id_dir(bucket, object, upload_id), name);
        let futures = self.disks.iter().flatten().map(|disk| {
            let path = path.clone();
            async move {
                match disk.delete(XL_META_BUCKET, &path, DeleteOptions::default()).await {
                    Ok(()) | Err(DiskError::FileNotFound) => {}
                    Err(err) => warn!("removing part {} failed on {}: {}", path, disk.to_string(), err),
                }
            }
        });
        join_all(futures).await;
    }

    /// Drops `upload_id` from the object's registry, removing the whole
    /// multipart directory once no uploads remain. Callers must not hold
    /// the upload-scoped lock; the object-multipart lock is taken here.
    async fn remove_upload_from_registry(&self, bucket: &str, object: &str, upload_id: &str) -> Result<()> {
        let _guard = self.ns_lock.lock(XL_META_BUCKET, &Self::multipart_dir(bucket, object)).await;

        let mut index = match read_uploads_json(&self.disks, bucket, object, self.read_quorum()).await {
            Ok(index) => index,
            Err(DiskError::FileNotFound) => return Ok(()),
            Err(err) => return Err(to_object_err(err, &[bucket, object])),
        };

        index.remove(upload_id);

        if !index.is_empty() {
            return write_uploads_json(&self.disks, bucket, object, &index, self.write_quorum())
                .await
                .map_err(|err| to_object_err(err, &[bucket, object]));
        }

        self.delete_all(XL_META_BUCKET, &Self::multipart_dir(bucket, object))
            .await
            .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &Self::multipart_dir(bucket, object)]))
    }

    /// Initiates a multipart upload and returns its opaque upload ID.
    ///
    /// The upload directory is materialized first and only then advertised
    /// in `uploads.json`; a failed registry write rolls the directory back.
    #[tracing::instrument(level = "debug", skip(self, meta))]
    pub async fn new_multipart_upload(&self, bucket: &str, object: &str, meta: HashMap<String, String>) -> Result<String> {
        check_new_multipart_args(bucket, object)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        let mut meta = meta;
        if meta.get("content-type").map_or(true, |v| v.is_empty()) {
            meta.insert("content-type".to_owned(), content_type_of(object));
        }

        // Guards the directory contents of multipart/<bucket>/<object>/.
        let _guard = self.ns_lock.lock(XL_META_BUCKET, &Self::multipart_dir(bucket, object)).await;

        let now = self.clock.now_utc();
        let upload_id = Uuid::new_v4().to_string();
        let upload_id_path = Self::upload_id_dir(bucket, object, &upload_id);
        let tmp_path = Self::tmp_dir(&upload_id);

        let mut xl_meta = XlMeta::new(&upload_id, self.data_blocks, self.parity_blocks, BLOCK_SIZE, now);
        xl_meta.meta = meta;

        let records: Vec<Option<XlMeta>> = self.disks.iter().map(|_| Some(xl_meta.clone())).collect();

        if let Err(err) = write_unique_xl_metadata(&self.disks, XL_META_BUCKET, &tmp_path, &records, self.write_quorum()).await
        {
            return Err(to_object_err(err, &[XL_META_BUCKET, &tmp_path]));
        }

        if let Err(err) = self
            .rename_object_dir(&self.disks, XL_META_BUCKET, &tmp_path, XL_META_BUCKET, &upload_id_path)
            .await
        {
            let _ = self.delete_all(XL_META_BUCKET, &tmp_path).await;
            return Err(to_object_err(err, &[XL_META_BUCKET, &upload_id_path]));
        }

        let mut index = match read_uploads_json(&self.disks, bucket, object, self.read_quorum()).await {
            Ok(index) => index,
            Err(DiskError::FileNotFound) => Default::default(),
            Err(err) => return Err(to_object_err(err, &[bucket, object])),
        };
        index.add(&upload_id, now);

        if let Err(err) = write_uploads_json(&self.disks, bucket, object, &index, self.write_quorum()).await {
            let _ = self.delete_all(XL_META_BUCKET, &upload_id_path).await;
            return Err(to_object_err(err, &[bucket, object]));
        }

        Ok(upload_id)
    }

    /// Streams one part into the upload, erasure-coded across the online
    /// disks, and returns its canonical MD5. Re-uploading a part number
    /// overwrites; the last committer's etag is authoritative.
    #[tracing::instrument(level = "debug", skip(self, data))]
    pub async fn put_object_part<R>(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_id: usize,
        size: u64,
        data: &mut R,
        md5_hex: Option<&str>,
    ) -> Result<String>
    where
        R: AsyncRead + Unpin + Send,
    {
        check_put_object_part_args(bucket, object, upload_id)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        if part_id == 0 || part_id > MAX_PARTS_COUNT {
            return Err(StorageError::InvalidPart(part_id));
        }

        let upload_id_path = Self::upload_id_dir(bucket, object, upload_id);
        let _guard = self.ns_lock.lock(XL_META_BUCKET, &upload_id_path).await;

        if !self.is_upload_id_exists(bucket, object, upload_id).await {
            return Err(StorageError::InvalidUploadID(
                bucket.to_owned(),
                object.to_owned(),
                upload_id.to_owned(),
            ));
        }

        let (parts_metadata, errs) = read_all_xl_metadata(&self.disks, XL_META_BUCKET, &upload_id_path).await;
        let (online_disks, higher_version) = list_online_disks(&self.disks, &parts_metadata, &errs);

        let mut xl_meta = pick_valid_xl_meta(&parts_metadata).map_err(|err| to_object_err(err, &[bucket, object]))?;

        let part_suffix = part_name(part_id);
        let tmp_part_path = format!("{}/{}", Self::tmp_dir(upload_id), part_suffix);

        let erasure = Erasure::new(xl_meta.erasure.data_blocks, xl_meta.erasure.parity_blocks, xl_meta.erasure.block_size);
        let mut writer = ErasureWriter::create(
            &online_disks,
            erasure,
            xl_meta.erasure.distribution.clone(),
            XL_META_BUCKET,
            &tmp_part_path,
            self.write_quorum(),
        )
        .await
        .map_err(|err| to_object_err(err, &[bucket, object]))?;

        let mut md5_writer = Md5::new();
        let mut buf = vec![0u8; xl_meta.erasure.block_size];
        let mut total: u64 = 0;

        loop {
            let n = read_full(data, &mut buf).await.map_err(|e| StorageError::other(e))?;
            if n == 0 {
                break;
            }

            md5_writer.update(&buf[..n]);

            let m = writer
                .append(&buf[..n])
                .await
                .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &tmp_part_path]))?;
            if m != n {
                return Err(StorageError::Unexpected);
            }

            total += n as u64;
            if n < buf.len() {
                break;
            }
        }

        if total < size {
            warn!("part stream ended early: got {} of {} declared bytes", total, size);
            return Err(StorageError::Unexpected);
        }

        let new_md5_hex = faster_hex::hex_string(md5_writer.finalize().as_slice());
        if let Some(expected) = md5_hex {
            if !expected.eq_ignore_ascii_case(&new_md5_hex) {
                return Err(StorageError::BadDigest {
                    expected: expected.to_owned(),
                    calculated: new_md5_hex,
                });
            }
        }

        // The upload may have been aborted while bytes were streaming in a
        // distributed deployment; the staged bytes are then abandoned.
        if !self.is_upload_id_exists(bucket, object, upload_id).await {
            return Err(StorageError::InvalidUploadID(
                bucket.to_owned(),
                object.to_owned(),
                upload_id.to_owned(),
            ));
        }

        let online_disks = writer.online_disks();
        let hashes = writer.finish();

        let part_path = format!("{upload_id_path}/{part_suffix}");
        self.rename_part_file(&online_disks, &tmp_part_path, &part_path)
            .await
            .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &part_path]))?;

        xl_meta.stat.version = higher_version;
        xl_meta.add_object_part(part_id, part_suffix.clone(), new_md5_hex.clone(), total);

        // Each disk's record carries only the digest of the shard it holds.
        let mut records: Vec<Option<XlMeta>> = Vec::with_capacity(self.disks.len());
        for i in 0..self.disks.len() {
            if online_disks.get(i).map_or(true, |d| d.is_none()) {
                records.push(None);
                continue;
            }

            let mut record = match &parts_metadata[i] {
                Some(meta) => meta.clone(),
                None => {
                    records.push(None);
                    continue;
                }
            };

            record.stat = xl_meta.stat.clone();
            record.meta = xl_meta.meta.clone();
            record.parts = xl_meta.parts.clone();
            let shard_index = record.erasure.shard_index(i);
            record.erasure.set_checksum(&part_suffix, hashes[shard_index].clone());

            records.push(Some(record));
        }

        let tmp_path = Self::tmp_dir(upload_id);
        write_unique_xl_metadata(&online_disks, XL_META_BUCKET, &tmp_path, &records, self.write_quorum())
            .await
            .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &tmp_path]))?;
        rename_xl_metadata(&online_disks, XL_META_BUCKET, &tmp_path, XL_META_BUCKET, &upload_id_path, self.write_quorum())
            .await
            .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &upload_id_path]))?;

        Ok(new_md5_hex)
    }

    /// Lists uploaded parts with numbers above `part_number_marker`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_object_parts(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number_marker: usize,
        max_parts: usize,
    ) -> Result<ListPartsInfo> {
        check_list_parts_args(bucket, object, upload_id)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        let upload_id_path = Self::upload_id_dir(bucket, object, upload_id);
        let _guard = self.ns_lock.lock(XL_META_BUCKET, &upload_id_path).await;

        if !self.is_upload_id_exists(bucket, object, upload_id).await {
            return Err(StorageError::InvalidUploadID(
                bucket.to_owned(),
                object.to_owned(),
                upload_id.to_owned(),
            ));
        }

        let xl_meta = read_xl_metadata_quorum(&self.disks, XL_META_BUCKET, &upload_id_path, self.read_quorum())
            .await
            .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &upload_id_path]))?;

        let mut result = ListPartsInfo {
            bucket: bucket.to_owned(),
            object: object.to_owned(),
            upload_id: upload_id.to_owned(),
            part_number_marker,
            max_parts: max_parts.min(MAX_PARTS_LIST),
            user_defined: xl_meta.meta.clone(),
            ..Default::default()
        };

        if xl_meta.parts.is_empty() || result.max_parts == 0 {
            return Ok(result);
        }

        let remaining: Vec<&ObjectPartInfo> = xl_meta.parts.iter().filter(|p| p.number > part_number_marker).collect();

        for part in remaining.iter().take(result.max_parts) {
            let part_path = format!("{upload_id_path}/{}", part.name);
            let fi = self
                .stat_part(&part_path)
                .await
                .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &part_path]))?;

            result.parts.push(PartInfo {
                part_num: part.number,
                last_mod: fi.mod_time,
                etag: part.etag.clone(),
                size: part.size,
            });
        }

        if remaining.len() > result.parts.len() {
            result.is_truncated = true;
            result.next_part_number_marker = result.parts.last().map(|p| p.part_num).unwrap_or_default();
        }

        Ok(result)
    }

    /// Assembles the object from the given parts, in the given order, and
    /// atomically publishes it. All-or-nothing with respect to visibility.
    #[tracing::instrument(level = "debug", skip(self, uploaded_parts))]
    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        uploaded_parts: Vec<CompletePart>,
    ) -> Result<String> {
        check_complete_multipart_args(bucket, object, upload_id)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        let upload_id_path = Self::upload_id_dir(bucket, object, upload_id);
        let s3_md5 = get_complete_multipart_md5(&uploaded_parts);

        {
            let _upload_guard = self.ns_lock.lock(XL_META_BUCKET, &upload_id_path).await;

            if !self.is_upload_id_exists(bucket, object, upload_id).await {
                return Err(StorageError::InvalidUploadID(
                    bucket.to_owned(),
                    object.to_owned(),
                    upload_id.to_owned(),
                ));
            }

            let (parts_metadata, errs) = read_all_xl_metadata(&self.disks, XL_META_BUCKET, &upload_id_path).await;
            if let Some(err) = reduce_read_quorum_errs(&errs, OBJECT_OP_IGNORED_ERRS, self.read_quorum()) {
                return Err(to_object_err(err, &[XL_META_BUCKET, &upload_id_path]));
            }

            let current_xl_meta = pick_valid_xl_meta(&parts_metadata).map_err(|err| to_object_err(err, &[bucket, object]))?;

            let mut object_size: u64 = 0;
            let mut final_parts: Vec<ObjectPartInfo> = Vec::with_capacity(uploaded_parts.len());

            for (i, part) in uploaded_parts.iter().enumerate() {
                let idx = current_xl_meta
                    .object_part_index(part.part_num)
                    .ok_or(StorageError::InvalidPart(part.part_num))?;
                let stored = &current_xl_meta.parts[idx];

                if stored.etag != part.etag {
                    return Err(StorageError::BadDigest {
                        expected: part.etag.clone(),
                        calculated: stored.etag.clone(),
                    });
                }

                // All parts except the last one have to meet the minimum.
                if i < uploaded_parts.len() - 1 && !is_min_allowed_part_size(stored.size) {
                    return Err(StorageError::PartTooSmall {
                        part_number: part.part_num,
                        size: stored.size,
                        min: MIN_PART_SIZE,
                    });
                }

                object_size += stored.size;
                final_parts.push(ObjectPartInfo {
                    number: part.part_num,
                    name: part_name(part.part_num),
                    etag: stored.etag.clone(),
                    size: stored.size,
                });
            }

            if self.parent_dir_is_object(bucket, object).await {
                return Err(to_object_err(DiskError::FileAccessDenied, &[bucket, object]));
            }

            let mut xl_meta = current_xl_meta.clone();
            xl_meta.parts = final_parts;
            xl_meta.stat.size = object_size;
            xl_meta.stat.mod_time = self.clock.now_utc();
            xl_meta.meta.insert("md5Sum".to_owned(), s3_md5.clone());

            // Same stat/meta/parts on every disk; each keeps its own shard
            // checksums.
            let mut records: Vec<Option<XlMeta>> = Vec::with_capacity(self.disks.len());
            let mut write_disks: Vec<Option<DiskStore>> = Vec::with_capacity(self.disks.len());
            for (i, disk) in self.disks.iter().enumerate() {
                match &parts_metadata[i] {
                    Some(meta) => {
                        let mut record = meta.clone();
                        record.stat = xl_meta.stat.clone();
                        record.meta = xl_meta.meta.clone();
                        record.parts = xl_meta.parts.clone();
                        records.push(Some(record));
                        write_disks.push(disk.clone());
                    }
                    None => {
                        records.push(None);
                        write_disks.push(None);
                    }
                }
            }

            let tmp_path = Self::tmp_dir(upload_id);
            write_unique_xl_metadata(&write_disks, XL_META_BUCKET, &tmp_path, &records, self.write_quorum())
                .await
                .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &tmp_path]))?;
            rename_xl_metadata(&write_disks, XL_META_BUCKET, &tmp_path, XL_META_BUCKET, &upload_id_path, self.write_quorum())
                .await
                .map_err(|err| to_object_err(err, &[XL_META_BUCKET, &upload_id_path]))?;

            // Destination swap, under the object-data lock.
            let _object_guard = self.ns_lock.lock(bucket, object).await;

            let mut pre_swap: Option<String> = None;
            if self.is_object(bucket, object).await {
                let unique_id = Uuid::new_v4().to_string();
                let aside = format!("{TMP_META_PREFIX}/{unique_id}");
                self.rename_object_dir(&self.disks, bucket, object, XL_META_BUCKET, &aside)
                    .await
                    .map_err(|err| to_object_err(err, &[bucket, object]))?;
                pre_swap = Some(aside);
            }

            // Uploaded parts the client did not select never reach the
            // final namespace.
            for cur_part in current_xl_meta.parts.iter() {
                if xl_meta.object_part_index(cur_part.number).is_none() {
                    self.remove_object_part(bucket, object, upload_id, &cur_part.name).await;
                }
            }

            // The commit point: the object becomes visible here.
            self.rename_object_dir(&self.disks, XL_META_BUCKET, &upload_id_path, bucket, object)
                .await
                .map_err(|err| to_object_err(err, &[bucket, object]))?;

            if let Some(aside) = pre_swap {
                if let Err(err) = self.delete_all(XL_META_BUCKET, &aside).await {
                    warn!("leaving pre-swap copy {} behind: {}", aside, err);
                }
            }
            if let Err(err) = self.delete_all(XL_META_BUCKET, &Self::tmp_dir(upload_id)).await {
                warn!("leaving staging area of {} behind: {}", upload_id, err);
            }
        }

        // The upload lock is gone once the commit has happened; only the
        // object-multipart lock is taken for the registry tail.
        self.remove_upload_from_registry(bucket, object, upload_id).await?;

        Ok(s3_md5)
    }

    /// Aborts an upload, deleting all its part files and metadata.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn abort_multipart_upload(&self, bucket: &str, object: &str, upload_id: &str) -> Result<()> {
        check_abort_multipart_args(bucket, object, upload_id)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        {
            let _guard = self.ns_lock.lock(XL_META_BUCKET, &Self::upload_id_dir(bucket, object, upload_id)).await;

            if !self.is_upload_id_exists(bucket, object, upload_id).await {
                return Err(StorageError::InvalidUploadID(
                    bucket.to_owned(),
                    object.to_owned(),
                    upload_id.to_owned(),
                ));
            }

            cleanup_uploaded_parts(&self.disks, bucket, object, upload_id, self.write_quorum())
                .await
                .map_err(|err| to_object_err(err, &[bucket, object]))?;
        }

        self.remove_upload_from_registry(bucket, object, upload_id).await
    }

    /// Lists in-progress uploads of one object, in initiation order.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn list_multipart_uploads(
        &self,
        bucket: &str,
        prefix: &str,
        key_marker: Option<String>,
        upload_id_marker: Option<String>,
        delimiter: Option<String>,
        max_uploads: usize,
    ) -> Result<ListMultipartsInfo> {
        check_list_multipart_args(bucket, prefix)?;

        if !self.is_bucket_exist(bucket).await {
            return Err(StorageError::BucketNotFound(bucket.to_owned()));
        }

        let mut result = ListMultipartsInfo {
            key_marker,
            upload_id_marker: upload_id_marker.clone(),
            max_uploads,
            prefix: prefix.to_owned(),
            delimiter,
            ..Default::default()
        };

        let index = match read_uploads_json(&self.disks, bucket, prefix, self.read_quorum()).await {
            Ok(index) => index,
            Err(DiskError::FileNotFound) | Err(DiskError::VolumeNotFound) => return Ok(result),
            Err(err) => return Err(to_object_err(err, &[bucket, prefix])),
        };

        let mut uploads = index.uploads;

        if let Some(marker) = upload_id_marker {
            if let Some(idx) = uploads.iter().position(|u| u.upload_id == marker) {
                uploads.drain(..=idx);
            }
        }

        let truncated = uploads.len() > max_uploads;
        uploads.truncate(max_uploads);

        result.uploads = uploads
            .into_iter()
            .map(|u| MultipartInfo {
                bucket: bucket.to_owned(),
                object: prefix.to_owned(),
                upload_id: u.upload_id,
                initiated: Some(u.initiated),
            })
            .collect();
        result.is_truncated = truncated;
        if truncated {
            result.next_upload_id_marker = result.uploads.last().map(|u| u.upload_id.clone());
        }

        Ok(result)
    }
}
