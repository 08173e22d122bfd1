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

//! An S3-compatible, erasure-coded object store core centered on multipart
//! uploads. Objects are striped as `data + parity` Reed-Solomon shards over
//! a fixed set of disks; every durable change is staged under a temporary
//! path and published by rename, so the store exposes either a fully-formed
//! object or none at all.

pub mod bucket;
pub mod disk;
pub mod erasure_coding;
pub mod error;
pub mod filemeta;
pub mod meta_store;
pub mod multipart;
pub mod namespace_lock;
mod object;
pub mod store_api;
pub mod store_utils;
pub mod uploads;

pub use disk::{DiskAPI, DiskStore, LocalDisk};
pub use error::{Result, StorageError};
pub use multipart::XlObjects;
pub use namespace_lock::{Locker, NsLockMap};
pub use store_api::{Clock, CompletePart, ListMultipartsInfo, ListPartsInfo, MultipartInfo, ObjectInfo, PartInfo, SystemClock};
