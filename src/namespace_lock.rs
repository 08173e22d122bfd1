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

//! Advisory named locks over the storage namespace. The coordinator never
//! reaches for a global registry; it is handed a [`Locker`] at construction
//! so tests can substitute a deterministic one.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// A process-wide named mutex service keyed by `(volume, path)`.
/// Acquisition is fair: contenders are granted the lock in arrival order.
#[async_trait::async_trait]
pub trait Locker: Debug + Send + Sync + 'static {
    async fn lock(&self, volume: &str, path: &str) -> LockGuard;
}

#[derive(Debug)]
struct NsLockEntry {
    mutex: Arc<tokio::sync::Mutex<()>>,
    reference: usize,
}

/// In-process [`Locker`] backed by a refcounted mutex per resource. Entries
/// are pruned once the last interested party releases.
#[derive(Debug, Default)]
pub struct NsLockMap {
    lock_map: Arc<Mutex<HashMap<String, NsLockEntry>>>,
}

impl NsLockMap {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_key(volume: &str, path: &str) -> String {
    format!("{volume}/{path}")
}

#[async_trait::async_trait]
impl Locker for NsLockMap {
    async fn lock(&self, volume: &str, path: &str) -> LockGuard {
        let resource = resource_key(volume, path);

        let mutex = {
            let mut map = self.lock_map.lock().expect("lock map poisoned");
            let entry = map.entry(resource.clone()).or_insert_with(|| NsLockEntry {
                mutex: Arc::new(tokio::sync::Mutex::new(())),
                reference: 0,
            });
            entry.reference += 1;
            entry.mutex.clone()
        };

        let guard = mutex.lock_owned().await;

        LockGuard {
            guard: Some(guard),
            lock_map: self.lock_map.clone(),
            resource,
        }
    }
}

/// Releases the named lock on drop, on every exit path.
#[derive(Debug)]
pub struct LockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock_map: Arc<Mutex<HashMap<String, NsLockEntry>>>,
    resource: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.guard.take();

        let mut map = self.lock_map.lock().expect("lock map poisoned");
        if let Some(entry) = map.get_mut(&self.resource) {
            entry.reference -= 1;
            if entry.reference == 0 {
                map.remove(&self.resource);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_mutual_exclusion() {
        let locker = Arc::new(NsLockMap::new());
        let counter = Arc::new(Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locker = locker.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locker.lock("vol", "a/b").await;
                {
                    let mut c = counter.lock().unwrap();
                    *c += 1;
                    assert_eq!(*c % 2, 1);
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
                let mut c = counter.lock().unwrap();
                *c += 1;
                assert_eq!(*c % 2, 0);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_resources_do_not_contend() {
        let locker = NsLockMap::new();
        let _a = locker.lock("vol", "a").await;
        let _b = locker.lock("vol", "b").await;
    }

    #[tokio::test]
    async fn test_entries_are_pruned() {
        let locker = NsLockMap::new();
        {
            let _guard = locker.lock("vol", "a").await;
            assert_eq!(locker.lock_map.lock().unwrap().len(), 1);
        }
        assert_eq!(locker.lock_map.lock().unwrap().len(), 0);
    }
}
