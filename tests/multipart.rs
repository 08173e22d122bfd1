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

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use md5::{Digest, Md5};
use xlstore::disk::{DeleteOptions, XL_META_BUCKET};
use xlstore::filemeta::XlMeta;
use xlstore::{CompletePart, DiskAPI, DiskStore, LocalDisk, StorageError, XlObjects};

const MIB: usize = 1024 * 1024;

async fn new_disk_set(dir: &tempfile::TempDir, n: usize) -> Vec<Option<DiskStore>> {
    let mut disks = Vec::with_capacity(n);
    for i in 0..n {
        let disk = LocalDisk::new(dir.path().join(format!("disk{i}"))).await.unwrap();
        disks.push(Some(Arc::new(disk) as DiskStore));
    }
    disks
}

async fn new_store(dir: &tempfile::TempDir) -> (XlObjects, Vec<Option<DiskStore>>) {
    let disks = new_disk_set(dir, 6).await;
    let store = XlObjects::new(disks.clone(), 4, 2).await.unwrap();
    store.make_bucket("bucket").await.unwrap();
    (store, disks)
}

fn md5_hex(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    faster_hex::hex_string(hasher.finalize().as_slice())
}

fn composite_etag(etags: &[&str]) -> String {
    let mut buf = Vec::new();
    for etag in etags {
        buf.extend(hex_simd::decode_to_vec(etag.as_bytes()).unwrap());
    }
    format!("{}-{}", md5_hex(&buf), etags.len())
}

async fn put_part(store: &XlObjects, object: &str, upload_id: &str, part_id: usize, data: &[u8]) -> String {
    let mut reader = Cursor::new(data.to_vec());
    store
        .put_object_part("bucket", object, upload_id, part_id, data.len() as u64, &mut reader, None)
        .await
        .unwrap()
}

async fn get_bytes(store: &XlObjects, object: &str) -> Vec<u8> {
    let mut writer = Cursor::new(Vec::new());
    store.get_object("bucket", object, &mut writer).await.unwrap();
    writer.into_inner()
}

fn parts(entries: &[(usize, &str)]) -> Vec<CompletePart> {
    entries
        .iter()
        .map(|(part_num, etag)| CompletePart {
            part_num: *part_num,
            etag: (*etag).to_owned(),
        })
        .collect()
}

#[tokio::test]
async fn test_initiate_lists_no_parts() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();

    let listing = store.list_object_parts("bucket", "key", &upload_id, 0, 1000).await.unwrap();
    assert!(listing.parts.is_empty());
    assert!(!listing.is_truncated);
}

#[tokio::test]
async fn test_initiate_validates_names() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    assert!(matches!(
        store.new_multipart_upload("xy", "key", HashMap::new()).await,
        Err(StorageError::BucketNameInvalid(_))
    ));
    assert!(matches!(
        store.new_multipart_upload("bucket", "", HashMap::new()).await,
        Err(StorageError::ObjectNameInvalid(_, _))
    ));
    assert!(matches!(
        store.new_multipart_upload("no-such-bucket", "key", HashMap::new()).await,
        Err(StorageError::BucketNotFound(_))
    ));
}

#[tokio::test]
async fn test_initiate_defaults_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "report.pdf", HashMap::new()).await.unwrap();
    let listing = store.list_object_parts("bucket", "report.pdf", &upload_id, 0, 1).await.unwrap();
    assert_eq!(listing.user_defined.get("content-type").unwrap(), "application/pdf");
}

#[tokio::test]
async fn test_put_part_reflected_in_listing() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let data = vec![0x41u8; 6 * MIB];
    let etag = put_part(&store, "key", &upload_id, 1, &data).await;
    assert_eq!(etag, md5_hex(&data));

    let listing = store.list_object_parts("bucket", "key", &upload_id, 0, 1000).await.unwrap();
    assert_eq!(listing.parts.len(), 1);
    assert_eq!(listing.parts[0].part_num, 1);
    assert_eq!(listing.parts[0].etag, etag);
    assert_eq!(listing.parts[0].size, data.len() as u64);
    assert!(listing.parts[0].last_mod.is_some());
}

#[tokio::test]
async fn test_put_part_md5_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let mut reader = Cursor::new(vec![1u8; 1024]);
    let err = store
        .put_object_part("bucket", "key", &upload_id, 1, 1024, &mut reader, Some(&md5_hex(b"other")))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::BadDigest { .. }));
}

#[tokio::test]
async fn test_put_part_accepts_uppercase_md5() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let data = vec![9u8; 2048];
    let expected = md5_hex(&data).to_uppercase();
    let mut reader = Cursor::new(data.clone());
    store
        .put_object_part("bucket", "key", &upload_id, 1, data.len() as u64, &mut reader, Some(&expected))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_put_part_overwrite_keeps_latest() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let first = put_part(&store, "key", &upload_id, 1, &vec![1u8; MIB]).await;
    let second = put_part(&store, "key", &upload_id, 1, &vec![2u8; 2 * MIB]).await;
    assert_ne!(first, second);

    let listing = store.list_object_parts("bucket", "key", &upload_id, 0, 1000).await.unwrap();
    assert_eq!(listing.parts.len(), 1);
    assert_eq!(listing.parts[0].etag, second);
    assert_eq!(listing.parts[0].size, (2 * MIB) as u64);
}

#[tokio::test]
async fn test_zero_byte_part() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let etag = put_part(&store, "key", &upload_id, 1, &[]).await;
    assert_eq!(etag, "d41d8cd98f00b204e9800998ecf8427e");

    let listing = store.list_object_parts("bucket", "key", &upload_id, 0, 1000).await.unwrap();
    assert_eq!(listing.parts[0].size, 0);
}

#[tokio::test]
async fn test_invalid_upload_id() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let mut reader = Cursor::new(vec![0u8; 16]);
    let err = store
        .put_object_part("bucket", "key", "no-such-upload", 1, 16, &mut reader, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidUploadID(_, _, _)));

    let err = store.abort_multipart_upload("bucket", "key", "no-such-upload").await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidUploadID(_, _, _)));
}

#[tokio::test]
async fn test_part_number_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    for part_id in [0usize, 10001] {
        let mut reader = Cursor::new(vec![0u8; 16]);
        let err = store
            .put_object_part("bucket", "key", &upload_id, part_id, 16, &mut reader, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPart(_)));
    }
}

// End-to-end scenario: two parts, completed in order.
#[tokio::test]
async fn test_simple_upload() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();

    let part1 = vec![0x41u8; 6 * MIB];
    let part2 = vec![0x42u8; MIB];
    let e1 = put_part(&store, "key", &upload_id, 1, &part1).await;
    let e2 = put_part(&store, "key", &upload_id, 2, &part2).await;

    let final_etag = store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e1), (2, &e2)]))
        .await
        .unwrap();
    assert_eq!(final_etag, composite_etag(&[&e1, &e2]));

    let mut expected = part1;
    expected.extend_from_slice(&part2);
    assert_eq!(get_bytes(&store, "key").await, expected);
}

// End-to-end scenario: the client's completion order decides the layout.
#[tokio::test]
async fn test_complete_reorders_parts() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();

    let part1 = vec![1u8; 5 * MIB];
    let part2 = vec![2u8; 1024];
    let part3 = vec![3u8; 5 * MIB];
    let e1 = put_part(&store, "key", &upload_id, 1, &part1).await;
    let e2 = put_part(&store, "key", &upload_id, 2, &part2).await;
    let e3 = put_part(&store, "key", &upload_id, 3, &part3).await;

    let final_etag = store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(3, &e3), (1, &e1), (2, &e2)]))
        .await
        .unwrap();
    assert_eq!(final_etag, composite_etag(&[&e3, &e1, &e2]));

    let mut expected = part3;
    expected.extend_from_slice(&part1);
    expected.extend_from_slice(&part2);
    assert_eq!(get_bytes(&store, "key").await, expected);
}

// End-to-end scenario: a stale etag of an overwritten part is rejected.
#[tokio::test]
async fn test_complete_rejects_stale_etag() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "key", &upload_id, 1, &vec![1u8; MIB]).await;
    let e2 = put_part(&store, "key", &upload_id, 1, &vec![2u8; MIB]).await;
    assert_ne!(e1, e2);

    let err = store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::BadDigest { .. }));

    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e2)]))
        .await
        .unwrap();
    assert_eq!(get_bytes(&store, "key").await, vec![2u8; MIB]);
}

// End-to-end scenario: unselected parts are trimmed before the commit.
#[tokio::test]
async fn test_complete_trims_unselected_parts() {
    let dir = tempfile::tempdir().unwrap();
    let (store, disks) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    put_part(&store, "key", &upload_id, 1, &vec![1u8; 5 * MIB]).await;
    let e2 = put_part(&store, "key", &upload_id, 2, &vec![2u8; MIB]).await;
    put_part(&store, "key", &upload_id, 3, &vec![3u8; 5 * MIB]).await;

    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(2, &e2)]))
        .await
        .unwrap();

    assert_eq!(get_bytes(&store, "key").await, vec![2u8; MIB]);

    for disk in disks.iter().flatten() {
        assert!(disk.stat_file("bucket", "key/object2").await.is_ok());
        assert!(disk.stat_file("bucket", "key/object1").await.is_err());
        assert!(disk.stat_file("bucket", "key/object3").await.is_err());
    }
}

#[tokio::test]
async fn test_complete_part_too_small() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "key", &upload_id, 1, &vec![1u8; MIB]).await;
    let e2 = put_part(&store, "key", &upload_id, 2, &vec![2u8; MIB]).await;

    let err = store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e1), (2, &e2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::PartTooSmall { part_number: 1, .. }));
}

#[tokio::test]
async fn test_complete_unknown_part() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "key", &upload_id, 1, &vec![1u8; MIB]).await;

    let err = store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e1), (7, &e1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidPart(7)));
}

#[tokio::test]
async fn test_terminal_upload_rejects_further_calls() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "key", &upload_id, 1, &vec![1u8; MIB]).await;
    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e1)]))
        .await
        .unwrap();

    let err = store.list_object_parts("bucket", "key", &upload_id, 0, 10).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidUploadID(_, _, _)));

    let mut reader = Cursor::new(vec![0u8; 16]);
    let err = store
        .put_object_part("bucket", "key", &upload_id, 2, 16, &mut reader, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidUploadID(_, _, _)));
}

// End-to-end scenario: aborting one upload leaves the sibling intact.
#[tokio::test]
async fn test_abort_sibling_uploads() {
    let dir = tempfile::tempdir().unwrap();
    let (store, disks) = new_store(&dir).await;

    let u1 = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let u2 = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    put_part(&store, "key", &u1, 1, &vec![1u8; MIB]).await;

    store.abort_multipart_upload("bucket", "key", &u1).await.unwrap();

    let listing = store
        .list_multipart_uploads("bucket", "key", None, None, None, 100)
        .await
        .unwrap();
    assert_eq!(listing.uploads.len(), 1);
    assert_eq!(listing.uploads[0].upload_id, u2);

    let uploads_json_path = "multipart/bucket/key/uploads.json";
    assert!(disks[0].as_ref().unwrap().stat_file(XL_META_BUCKET, uploads_json_path).await.is_ok());

    store.abort_multipart_upload("bucket", "key", &u2).await.unwrap();

    for disk in disks.iter().flatten() {
        assert!(disk.stat_file(XL_META_BUCKET, uploads_json_path).await.is_err());
    }

    let listing = store
        .list_multipart_uploads("bucket", "key", None, None, None, 100)
        .await
        .unwrap();
    assert!(listing.uploads.is_empty());

    let err = store.list_object_parts("bucket", "key", &u1, 0, 10).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidUploadID(_, _, _)));
}

// End-to-end scenario: completion under an existing object's path fails.
#[tokio::test]
async fn test_parent_collision() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "a", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "a", &upload_id, 1, &vec![1u8; 1024]).await;
    store
        .complete_multipart_upload("bucket", "a", &upload_id, parts(&[(1, &e1)]))
        .await
        .unwrap();

    let upload_id = store.new_multipart_upload("bucket", "a/x", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "a/x", &upload_id, 1, &vec![2u8; 1024]).await;
    let err = store
        .complete_multipart_upload("bucket", "a/x", &upload_id, parts(&[(1, &e1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::PrefixAccessDenied(_, _)));
}

#[tokio::test]
async fn test_destination_replaced_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    for fill in [7u8, 8u8] {
        let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
        let data = vec![fill; 2 * MIB];
        let etag = put_part(&store, "key", &upload_id, 1, &data).await;
        store
            .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &etag)]))
            .await
            .unwrap();
        assert_eq!(get_bytes(&store, "key").await, data);
    }
}

// Invariant: all online copies of a committed xl.json agree on stat, meta
// and parts; only the shard checksums differ.
#[tokio::test]
async fn test_xl_meta_agreement_across_disks() {
    let dir = tempfile::tempdir().unwrap();
    let (store, disks) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let e1 = put_part(&store, "key", &upload_id, 1, &vec![5u8; 2 * MIB]).await;
    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &e1)]))
        .await
        .unwrap();

    let mut metas = Vec::new();
    for disk in disks.iter().flatten() {
        let data = disk.read_all("bucket", "key/xl.json").await.unwrap();
        metas.push(XlMeta::from_bytes(&data).unwrap());
    }

    for meta in metas.iter().skip(1) {
        assert_eq!(meta.stat, metas[0].stat);
        assert_eq!(meta.meta, metas[0].meta);
        assert_eq!(meta.parts, metas[0].parts);
    }

    let first_hash = &metas[0].erasure.checksums[0].hash;
    assert!(metas.iter().skip(1).any(|m| &m.erasure.checksums[0].hash != first_hash));
}

#[tokio::test]
async fn test_get_survives_lost_and_corrupt_shards() {
    let dir = tempfile::tempdir().unwrap();
    let (store, disks) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let data: Vec<u8> = (0..6 * MIB).map(|i| (i % 251) as u8).collect();
    let etag = put_part(&store, "key", &upload_id, 1, &data).await;
    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &etag)]))
        .await
        .unwrap();

    // one shard lost, one shard flipped
    disks[0]
        .as_ref()
        .unwrap()
        .delete("bucket", "key/object1", DeleteOptions::default())
        .await
        .unwrap();
    let disk1 = disks[1].as_ref().unwrap();
    let mut corrupted = disk1.read_all("bucket", "key/object1").await.unwrap().to_vec();
    corrupted[0] ^= 0xff;
    disk1
        .write_all("bucket", "key/object1", corrupted.into())
        .await
        .unwrap();

    assert_eq!(get_bytes(&store, "key").await, data);
}

#[tokio::test]
async fn test_operations_tolerate_one_missing_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut disks = new_disk_set(&dir, 6).await;
    disks[5] = None;
    let store = XlObjects::new(disks, 4, 2).await.unwrap();
    store.make_bucket("bucket").await.unwrap();

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let data = vec![6u8; 2 * MIB];
    let etag = put_part(&store, "key", &upload_id, 1, &data).await;
    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &etag)]))
        .await
        .unwrap();

    assert_eq!(get_bytes(&store, "key").await, data);
}

#[tokio::test]
async fn test_delete_object() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    let etag = put_part(&store, "key", &upload_id, 1, &vec![4u8; 1024]).await;
    store
        .complete_multipart_upload("bucket", "key", &upload_id, parts(&[(1, &etag)]))
        .await
        .unwrap();

    store.delete_object("bucket", "key").await.unwrap();

    let mut writer = Cursor::new(Vec::new());
    let err = store.get_object("bucket", "key", &mut writer).await.unwrap_err();
    assert!(matches!(err, StorageError::ObjectNotFound(_, _)));

    let err = store.delete_object("bucket", "key").await.unwrap_err();
    assert!(matches!(err, StorageError::ObjectNotFound(_, _)));
}

#[tokio::test]
async fn test_list_parts_pagination() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();
    for part_id in 1..=3 {
        put_part(&store, "key", &upload_id, part_id, &vec![part_id as u8; 1024]).await;
    }

    let page = store.list_object_parts("bucket", "key", &upload_id, 0, 2).await.unwrap();
    assert_eq!(page.parts.iter().map(|p| p.part_num).collect::<Vec<_>>(), vec![1, 2]);
    assert!(page.is_truncated);
    assert_eq!(page.next_part_number_marker, 2);

    let page = store
        .list_object_parts("bucket", "key", &upload_id, page.next_part_number_marker, 2)
        .await
        .unwrap();
    assert_eq!(page.parts.iter().map(|p| p.part_num).collect::<Vec<_>>(), vec![3]);
    assert!(!page.is_truncated);
}

#[tokio::test]
async fn test_list_multipart_uploads_markers() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap());
    }

    let listing = store
        .list_multipart_uploads("bucket", "key", None, None, None, 2)
        .await
        .unwrap();
    assert_eq!(listing.uploads.len(), 2);
    assert!(listing.is_truncated);
    assert_eq!(listing.uploads[0].upload_id, ids[0]);

    let marker = listing.next_upload_id_marker.clone().unwrap();
    let listing = store
        .list_multipart_uploads("bucket", "key", None, Some(marker), None, 2)
        .await
        .unwrap();
    assert_eq!(listing.uploads.len(), 1);
    assert_eq!(listing.uploads[0].upload_id, ids[2]);
    assert!(!listing.is_truncated);
}

#[tokio::test]
async fn test_concurrent_puts_distinct_parts() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = new_store(&dir).await;
    let store = Arc::new(store);

    let upload_id = store.new_multipart_upload("bucket", "key", HashMap::new()).await.unwrap();

    let mut handles = Vec::new();
    for part_id in 1..=4usize {
        let store = store.clone();
        let upload_id = upload_id.clone();
        handles.push(tokio::spawn(async move {
            let data = vec![part_id as u8; MIB];
            let mut reader = Cursor::new(data);
            store
                .put_object_part("bucket", "key", &upload_id, part_id, MIB as u64, &mut reader, None)
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let listing = store.list_object_parts("bucket", "key", &upload_id, 0, 1000).await.unwrap();
    assert_eq!(listing.parts.len(), 4);
    for (i, part) in listing.parts.iter().enumerate() {
        assert_eq!(part.part_num, i + 1);
        assert_eq!(part.etag, md5_hex(&vec![part.part_num as u8; MIB]));
    }
}
