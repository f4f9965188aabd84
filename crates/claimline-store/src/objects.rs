//! Object stores: in-memory and filesystem

use crate::StoreError;
use claimline_domain::now_millis;
use claimline_domain::traits::{Metadata, ObjectStore, ObjectSummary, StoredObject};
use claimline_domain::ServiceError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::UNIX_EPOCH;

/// In-memory object store
///
/// Keys are kept sorted so prefix listings come back in key order.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Write an object with an explicit modification time
    ///
    /// Used to simulate objects left behind by earlier runs.
    pub fn put_with_timestamp(
        &self,
        key: &str,
        body: &[u8],
        metadata: Metadata,
        last_modified: u64,
    ) -> Result<(), ServiceError> {
        self.lock()?.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                metadata,
                last_modified,
            },
        );
        Ok(())
    }

    /// All keys currently stored
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredObject>>, StoreError> {
        self.objects.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put(&self, key: &str, body: &[u8], metadata: Metadata) -> Result<(), ServiceError> {
        self.put_with_timestamp(key, body, metadata, now_millis())
    }

    fn get(&self, key: &str) -> Result<StoredObject, ServiceError> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, ServiceError> {
        let objects = self.lock()?;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectSummary {
                key: key.clone(),
                last_modified: obj.last_modified,
            })
            .collect())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<(), ServiceError> {
        let mut objects = self.lock()?;
        let mut object = objects
            .get(src)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(src.to_string()))?;
        object.last_modified = now_millis();
        objects.insert(dst.to_string(), object);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), ServiceError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Suffix of the sidecar file holding an object's metadata
const META_SUFFIX: &str = ".meta.json";

/// Object store rooted at a directory
///
/// Each object is a file at `<root>/<key>`; its metadata sits next to it in a
/// `.meta.json` sidecar. The file modification time is the object's
/// `last_modified`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open a store rooted at `root`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && !key.ends_with(META_SUFFIX)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn meta_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }

    fn modified_millis(path: &Path) -> Result<u64, StoreError> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0))
    }

    fn write(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(Self::meta_path(&path), serde_json::to_vec(metadata)?)?;
        fs::write(&path, body)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<StoredObject, StoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let body = fs::read(&path)?;
        let metadata = match fs::read(Self::meta_path(&path)) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Metadata::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(StoredObject {
            body,
            metadata,
            last_modified: Self::modified_millis(&path)?,
        })
    }

    fn walk(&self, dir: &Path, out: &mut Vec<ObjectSummary>) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                self.walk(&path, out)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.ends_with(META_SUFFIX) {
                continue;
            }
            out.push(ObjectSummary {
                key,
                last_modified: Self::modified_millis(&path)?,
            });
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        for target in [Self::meta_path(&path), path] {
            match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, body: &[u8], metadata: Metadata) -> Result<(), ServiceError> {
        Ok(self.write(key, body, &metadata)?)
    }

    fn get(&self, key: &str) -> Result<StoredObject, ServiceError> {
        Ok(self.read(key)?)
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, ServiceError> {
        let mut found = Vec::new();
        self.walk(&self.root, &mut found)?;
        found.retain(|summary| summary.key.starts_with(prefix));
        found.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(found)
    }

    fn copy(&self, src: &str, dst: &str) -> Result<(), ServiceError> {
        let object = self.read(src)?;
        Ok(self.write(dst, &object.body, &object.metadata)?)
    }

    fn delete(&self, key: &str) -> Result<(), ServiceError> {
        Ok(self.remove(key)?)
    }
}
