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

use crate::disk::error::DiskError;

pub type Result<T> = core::result::Result<T, StorageError>;

/// Caller-facing error taxonomy of the store.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StorageError {
    #[error("Bucket name invalid: {0}")]
    BucketNameInvalid(String),

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Bucket exists: {0}")]
    BucketExists(String),

    #[error("Object name invalid: {0}/{1}")]
    ObjectNameInvalid(String, String),

    #[error("Object not found: {0}/{1}")]
    ObjectNotFound(String, String),

    #[error("Invalid upload id: {0}/{1}-{2}")]
    InvalidUploadID(String, String, String),

    #[error("Invalid part number: {0}")]
    InvalidPart(usize),

    #[error("Part is too small: part {part_number} has {size} bytes, minimum allowed is {min} bytes")]
    PartTooSmall { part_number: usize, size: u64, min: u64 },

    #[error("Bad digest: expected {expected}, calculated {calculated}")]
    BadDigest { expected: String, calculated: String },

    #[error("Prefix access is denied: {0}/{1}")]
    PrefixAccessDenied(String, String),

    #[error("Storage reached its minimum free drive threshold")]
    StorageFull,

    #[error("Please reduce your request rate")]
    SlowDown,

    #[error("Storage resources are insufficient for the read operation")]
    InsufficientReadQuorum,

    #[error("Storage resources are insufficient for the write operation")]
    InsufficientWriteQuorum,

    #[error("unexpected storage state")]
    Unexpected,

    #[error("storage error: {0}")]
    Disk(DiskError),
}

impl StorageError {
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StorageError::Disk(DiskError::other(error))
    }
}

/// Translates a storage-primitive error into the caller-facing taxonomy.
/// `params` supplies context: `[bucket]`, `[bucket, object]`, or
/// `[bucket, object, upload_id]` — with an upload id present, a missing
/// path means the upload itself is gone.
pub fn to_object_err(err: DiskError, params: &[&str]) -> StorageError {
    let bucket = params.first().copied().unwrap_or_default();
    let object = params.get(1).copied().unwrap_or_default();

    match err {
        DiskError::FileNotFound => {
            if let Some(upload_id) = params.get(2) {
                return StorageError::InvalidUploadID(bucket.to_owned(), object.to_owned(), (*upload_id).to_owned());
            }
            StorageError::ObjectNotFound(bucket.to_owned(), object.to_owned())
        }
        DiskError::VolumeNotFound => StorageError::BucketNotFound(bucket.to_owned()),
        DiskError::VolumeExists => StorageError::BucketExists(bucket.to_owned()),
        DiskError::DiskFull => StorageError::StorageFull,
        DiskError::TooManyOpenFiles => StorageError::SlowDown,
        DiskError::FileNameTooLong => StorageError::ObjectNameInvalid(bucket.to_owned(), object.to_owned()),
        DiskError::FileAccessDenied => StorageError::PrefixAccessDenied(bucket.to_owned(), object.to_owned()),
        DiskError::IsNotRegular => StorageError::PrefixAccessDenied(bucket.to_owned(), object.to_owned()),
        DiskError::Unexpected | DiskError::ShortWrite => StorageError::Unexpected,
        DiskError::ErasureReadQuorum => StorageError::InsufficientReadQuorum,
        DiskError::ErasureWriteQuorum => StorageError::InsufficientWriteQuorum,
        err => StorageError::Disk(err),
    }
}

impl From<DiskError> for StorageError {
    fn from(err: DiskError) -> Self {
        to_object_err(err, &[])
    }
}

pub fn is_err_invalid_upload_id(err: &StorageError) -> bool {
    matches!(err, StorageError::InvalidUploadID(_, _, _))
}

pub fn is_err_object_not_found(err: &StorageError) -> bool {
    matches!(err, StorageError::ObjectNotFound(_, _))
}

pub fn is_err_bucket_not_found(err: &StorageError) -> bool {
    matches!(err, StorageError::BucketNotFound(_))
}
