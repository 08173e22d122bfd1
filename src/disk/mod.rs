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

pub mod error;
pub mod error_reduce;
pub mod local;

use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use time::OffsetDateTime;

use error::Result;

pub use local::LocalDisk;

/// Reserved volume holding all bookkeeping state of the store.
pub const XL_META_BUCKET: &str = ".xlstore.sys";
/// Subtree of [`XL_META_BUCKET`] holding in-progress multipart uploads.
pub const MULTIPART_META_PREFIX: &str = "multipart";
/// Subtree of [`XL_META_BUCKET`] where new files are staged before being
/// renamed into their live namespace. Renames out of here are commit points.
pub const TMP_META_PREFIX: &str = "tmp";

pub const XL_META_FILE: &str = "xl.json";
pub const UPLOADS_JSON_FILE: &str = "uploads.json";

pub const SLASH_SEPARATOR: &str = "/";

pub type DiskStore = Arc<dyn DiskAPI>;

/// Stat result for a single file.
#[derive(Debug, Clone, Default)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub mod_time: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct VolumeInfo {
    pub name: String,
    pub created: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    pub recursive: bool,
}

/// The storage primitives one disk backend must provide. Paths are opaque,
/// `/`-separated and always relative to a volume. Implementations must be
/// safe for concurrent use.
#[async_trait::async_trait]
pub trait DiskAPI: Debug + Send + Sync + 'static {
    fn to_string(&self) -> String;
    fn path(&self) -> PathBuf;
    async fn is_online(&self) -> bool;

    async fn make_volume(&self, volume: &str) -> Result<()>;
    async fn stat_volume(&self, volume: &str) -> Result<VolumeInfo>;

    async fn read_all(&self, volume: &str, path: &str) -> Result<Bytes>;
    async fn write_all(&self, volume: &str, path: &str, data: Bytes) -> Result<()>;
    /// Appends `buf` to the file at `path`, creating it (and parent
    /// directories) if absent. Returns the number of bytes appended, which
    /// must equal `buf.len()` on success.
    async fn append_file(&self, volume: &str, path: &str, buf: &[u8]) -> Result<usize>;
    /// Renames a file, or a directory tree when both paths carry a trailing
    /// slash. Parent directories of the destination are created as needed.
    async fn rename_file(&self, src_volume: &str, src_path: &str, dst_volume: &str, dst_path: &str) -> Result<()>;
    async fn stat_file(&self, volume: &str, path: &str) -> Result<FileInfo>;
    async fn delete(&self, volume: &str, path: &str, opt: DeleteOptions) -> Result<()>;
}
