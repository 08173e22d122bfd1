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

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::{DiskError, Result};
use super::{DeleteOptions, DiskAPI, FileInfo, VolumeInfo, SLASH_SEPARATOR};

/// A disk backend rooted at a local directory. Volumes are immediate child
/// directories of the root.
#[derive(Debug)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(to_volume_error)?;
        Ok(Self { root })
    }

    fn volume_dir(&self, volume: &str) -> Result<PathBuf> {
        check_path(volume)?;
        Ok(self.root.join(volume))
    }

    fn file_path(&self, volume: &str, path: &str) -> Result<PathBuf> {
        check_path(path)?;
        Ok(self.volume_dir(volume)?.join(path.trim_end_matches(SLASH_SEPARATOR)))
    }

    async fn access_volume(&self, volume: &str) -> Result<PathBuf> {
        let dir = self.volume_dir(volume)?;
        fs::metadata(&dir).await.map_err(to_volume_error)?;
        Ok(dir)
    }
}

// Paths come in from callers addressing the namespace; refuse anything that
// would escape the volume root.
fn check_path(path: &str) -> Result<()> {
    if path.split(SLASH_SEPARATOR).any(|seg| seg == "..") || Path::new(path).is_absolute() {
        return Err(DiskError::InvalidPath);
    }
    Ok(())
}

fn to_volume_error(e: std::io::Error) -> DiskError {
    match e.kind() {
        ErrorKind::NotFound => DiskError::VolumeNotFound,
        ErrorKind::PermissionDenied => DiskError::VolumeAccessDenied,
        _ => e.into(),
    }
}

async fn prepare_parent(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Drops the now-empty parent directory left behind by a rename out of a
/// staging area. Never crosses the volume root; failures are irrelevant.
async fn prune_parent(file_path: &Path, volume_dir: &Path) {
    if let Some(parent) = file_path.parent() {
        if parent != volume_dir && parent.starts_with(volume_dir) {
            let _ = fs::remove_dir(parent).await;
        }
    }
}

#[async_trait::async_trait]
impl DiskAPI for LocalDisk {
    fn to_string(&self) -> String {
        self.root.to_string_lossy().to_string()
    }

    fn path(&self) -> PathBuf {
        self.root.clone()
    }

    async fn is_online(&self) -> bool {
        fs::metadata(&self.root).await.is_ok()
    }

    async fn make_volume(&self, volume: &str) -> Result<()> {
        let dir = self.volume_dir(volume)?;
        match fs::create_dir(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(DiskError::VolumeExists),
            Err(e) => Err(to_volume_error(e)),
        }
    }

    async fn stat_volume(&self, volume: &str) -> Result<VolumeInfo> {
        let dir = self.volume_dir(volume)?;
        let meta = fs::metadata(&dir).await.map_err(to_volume_error)?;
        if !meta.is_dir() {
            return Err(DiskError::VolumeNotFound);
        }

        Ok(VolumeInfo {
            name: volume.to_owned(),
            created: meta.created().ok().map(time::OffsetDateTime::from),
        })
    }

    async fn read_all(&self, volume: &str, path: &str) -> Result<Bytes> {
        self.access_volume(volume).await?;
        let p = self.file_path(volume, path)?;
        let data = fs::read(&p).await?;
        Ok(Bytes::from(data))
    }

    async fn write_all(&self, volume: &str, path: &str, data: Bytes) -> Result<()> {
        self.access_volume(volume).await?;
        let p = self.file_path(volume, path)?;
        prepare_parent(&p).await?;
        fs::write(&p, &data).await?;
        Ok(())
    }

    async fn append_file(&self, volume: &str, path: &str, buf: &[u8]) -> Result<usize> {
        self.access_volume(volume).await?;
        let p = self.file_path(volume, path)?;
        prepare_parent(&p).await?;

        let mut file = fs::OpenOptions::new().append(true).create(true).open(&p).await?;
        file.write_all(buf).await?;
        file.flush().await?;

        Ok(buf.len())
    }

    async fn rename_file(&self, src_volume: &str, src_path: &str, dst_volume: &str, dst_path: &str) -> Result<()> {
        let src_volume_dir = self.access_volume(src_volume).await?;
        self.access_volume(dst_volume).await?;

        let src_is_dir = src_path.ends_with(SLASH_SEPARATOR);
        let dst_is_dir = dst_path.ends_with(SLASH_SEPARATOR);
        if src_is_dir != dst_is_dir {
            return Err(DiskError::FileAccessDenied);
        }

        let src = self.file_path(src_volume, src_path)?;
        let dst = self.file_path(dst_volume, dst_path)?;

        if src_is_dir {
            let meta = fs::metadata(&src).await?;
            if !meta.is_dir() {
                return Err(DiskError::FileAccessDenied);
            }
            // Only an empty directory may be replaced; a populated destination
            // must have been moved aside by the caller first.
            let _ = fs::remove_dir(&dst).await;
        }

        prepare_parent(&dst).await?;
        fs::rename(&src, &dst).await?;
        prune_parent(&src, &src_volume_dir).await;

        Ok(())
    }

    async fn stat_file(&self, volume: &str, path: &str) -> Result<FileInfo> {
        self.access_volume(volume).await?;
        let p = self.file_path(volume, path)?;
        let meta = fs::metadata(&p).await?;
        if meta.is_dir() {
            return Err(DiskError::FileNotFound);
        }

        Ok(FileInfo {
            name: path.to_owned(),
            size: meta.len(),
            mod_time: meta.modified().ok().map(time::OffsetDateTime::from),
        })
    }

    async fn delete(&self, volume: &str, path: &str, opt: DeleteOptions) -> Result<()> {
        let volume_dir = self.access_volume(volume).await?;
        let p = self.file_path(volume, path)?;
        let meta = fs::metadata(&p).await?;

        if meta.is_dir() {
            if opt.recursive {
                fs::remove_dir_all(&p).await?;
            } else {
                fs::remove_dir(&p).await.map_err(|e| {
                    if e.kind() == ErrorKind::DirectoryNotEmpty {
                        DiskError::VolumeNotEmpty
                    } else {
                        e.into()
                    }
                })?;
            }
        } else {
            fs::remove_file(&p).await?;
        }

        prune_parent(&p, &volume_dir).await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn new_disk(dir: &tempfile::TempDir) -> LocalDisk {
        LocalDisk::new(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_volume_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let disk = new_disk(&dir).await;

        assert_eq!(disk.stat_volume("vol").await.unwrap_err(), DiskError::VolumeNotFound);
        disk.make_volume("vol").await.unwrap();
        assert_eq!(disk.make_volume("vol").await.unwrap_err(), DiskError::VolumeExists);
        assert_eq!(disk.stat_volume("vol").await.unwrap().name, "vol");
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let disk = new_disk(&dir).await;
        disk.make_volume("vol").await.unwrap();

        assert_eq!(disk.append_file("vol", "a/b", b"hello ").await.unwrap(), 6);
        assert_eq!(disk.append_file("vol", "a/b", b"world").await.unwrap(), 5);
        assert_eq!(disk.read_all("vol", "a/b").await.unwrap().as_ref(), b"hello world");
        assert_eq!(disk.stat_file("vol", "a/b").await.unwrap().size, 11);
    }

    #[tokio::test]
    async fn test_rename_file_and_dir() {
        let dir = tempfile::tempdir().unwrap();
        let disk = new_disk(&dir).await;
        disk.make_volume("src").await.unwrap();
        disk.make_volume("dst").await.unwrap();

        disk.write_all("src", "d/f", Bytes::from_static(b"x")).await.unwrap();
        disk.rename_file("src", "d/f", "dst", "e/f").await.unwrap();
        assert_eq!(disk.read_all("dst", "e/f").await.unwrap().as_ref(), b"x");
        assert_eq!(disk.read_all("src", "d/f").await.unwrap_err(), DiskError::FileNotFound);

        disk.write_all("src", "tree/one", Bytes::from_static(b"1")).await.unwrap();
        disk.rename_file("src", "tree/", "dst", "moved/").await.unwrap();
        assert_eq!(disk.read_all("dst", "moved/one").await.unwrap().as_ref(), b"1");
    }

    #[tokio::test]
    async fn test_delete_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let disk = new_disk(&dir).await;
        disk.make_volume("vol").await.unwrap();

        disk.write_all("vol", "d/a", Bytes::from_static(b"a")).await.unwrap();
        disk.write_all("vol", "d/b", Bytes::from_static(b"b")).await.unwrap();
        disk.delete("vol", "d", DeleteOptions { recursive: true }).await.unwrap();
        assert_eq!(disk.read_all("vol", "d/a").await.unwrap_err(), DiskError::FileNotFound);
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let disk = new_disk(&dir).await;
        disk.make_volume("vol").await.unwrap();

        assert_eq!(
            disk.read_all("vol", "../escape").await.unwrap_err(),
            DiskError::InvalidPath
        );
    }
}
