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

use std::hash::{Hash, Hasher};
use std::io;

pub type Error = DiskError;
pub type Result<T> = core::result::Result<T, Error>;

/// Errors produced by the storage primitives of a single disk backend.
#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("unexpected error")]
    Unexpected,

    #[error("disk not found")]
    DiskNotFound,

    #[error("drive is faulty")]
    FaultyDisk,

    #[error("drive access denied")]
    DiskAccessDenied,

    #[error("drive path full")]
    DiskFull,

    #[error("file not found")]
    FileNotFound,

    #[error("file name too long")]
    FileNameTooLong,

    #[error("too many open files, please increase 'ulimit -n'")]
    TooManyOpenFiles,

    #[error("volume already exists")]
    VolumeExists,

    #[error("volume not found")]
    VolumeNotFound,

    #[error("volume is not empty")]
    VolumeNotEmpty,

    #[error("volume access denied")]
    VolumeAccessDenied,

    #[error("disk access denied")]
    FileAccessDenied,

    #[error("file is corrupted")]
    FileCorrupt,

    #[error("not of regular file type")]
    IsNotRegular,

    #[error("short write")]
    ShortWrite,

    #[error("erasure write quorum")]
    ErasureWriteQuorum,

    #[error("erasure read quorum")]
    ErasureReadQuorum,

    #[error("invalid path")]
    InvalidPath,

    #[error("io error {0}")]
    Io(io::Error),
}

impl DiskError {
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DiskError::Io(io::Error::other(error))
    }

    /// True when every slot carries a "not found" style error. Used to decide
    /// whether a fan-out read means the path simply does not exist anywhere.
    pub fn is_all_not_found(errs: &[Option<DiskError>]) -> bool {
        for err in errs.iter() {
            if let Some(err) = err {
                if err == &DiskError::FileNotFound || err == &DiskError::VolumeNotFound {
                    continue;
                }

                return false;
            }

            return false;
        }

        !errs.is_empty()
    }
}

impl From<io::Error> for DiskError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => DiskError::FileNotFound,
            io::ErrorKind::PermissionDenied => DiskError::FileAccessDenied,
            io::ErrorKind::StorageFull => DiskError::DiskFull,
            _ => DiskError::Io(e),
        }
    }
}

impl From<DiskError> for io::Error {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::Io(io_error) => io_error,
            e => io::Error::other(e),
        }
    }
}

impl From<serde_json::Error> for DiskError {
    fn from(_: serde_json::Error) -> Self {
        DiskError::FileCorrupt
    }
}

impl From<tokio::task::JoinError> for DiskError {
    fn from(e: tokio::task::JoinError) -> Self {
        DiskError::other(e)
    }
}

impl Clone for DiskError {
    fn clone(&self) -> Self {
        match self {
            DiskError::Io(io_error) => DiskError::Io(io::Error::new(io_error.kind(), io_error.to_string())),
            DiskError::Unexpected => DiskError::Unexpected,
            DiskError::DiskNotFound => DiskError::DiskNotFound,
            DiskError::FaultyDisk => DiskError::FaultyDisk,
            DiskError::DiskAccessDenied => DiskError::DiskAccessDenied,
            DiskError::DiskFull => DiskError::DiskFull,
            DiskError::FileNotFound => DiskError::FileNotFound,
            DiskError::FileNameTooLong => DiskError::FileNameTooLong,
            DiskError::TooManyOpenFiles => DiskError::TooManyOpenFiles,
            DiskError::VolumeExists => DiskError::VolumeExists,
            DiskError::VolumeNotFound => DiskError::VolumeNotFound,
            DiskError::VolumeNotEmpty => DiskError::VolumeNotEmpty,
            DiskError::VolumeAccessDenied => DiskError::VolumeAccessDenied,
            DiskError::FileAccessDenied => DiskError::FileAccessDenied,
            DiskError::FileCorrupt => DiskError::FileCorrupt,
            DiskError::IsNotRegular => DiskError::IsNotRegular,
            DiskError::ShortWrite => DiskError::ShortWrite,
            DiskError::ErasureWriteQuorum => DiskError::ErasureWriteQuorum,
            DiskError::ErasureReadQuorum => DiskError::ErasureReadQuorum,
            DiskError::InvalidPath => DiskError::InvalidPath,
        }
    }
}

impl PartialEq for DiskError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DiskError::Io(a), DiskError::Io(b)) => a.kind() == b.kind() && a.to_string() == b.to_string(),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl Eq for DiskError {}

impl Hash for DiskError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        if let DiskError::Io(e) = self {
            e.to_string().hash(state);
        }
    }
}
