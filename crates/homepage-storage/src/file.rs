//! JSON file storage backend
//!
//! One file holds several namespaces, mirroring the remote data store layout:
//!
//! ```text
//! {
//!   "home-page-app": { "migrations": {...}, "landing-pages": [[...]] },
//!   "other-app":     { ... }
//! }
//! ```
//!
//! Every write rewrites the whole document through a temporary file followed
//! by a rename, so a crash never leaves a half-written store behind.

use crate::debug::DebugSink;
use crate::error::{StorageError, StorageResult};
use crate::storage::{check_superuser, Storage, SUPERUSER_AUTHORITY};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Document = BTreeMap<String, BTreeMap<String, Value>>;

/// File-backed key/value store scoped to one namespace
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    namespace: String,
    authorities: Vec<String>,
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Open store at `path` for `namespace`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
            authorities: vec![SUPERUSER_AUTHORITY.to_string()],
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the authorities of the acting principal
    #[must_use]
    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }

    /// Backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Namespace inside the backing file
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn load(&self) -> StorageResult<Document> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::serialization(self.path.display().to_string(), e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(StorageError::io_error(&self.path, e)),
        }
    }

    async fn persist(&self, document: &Document) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StorageError::serialization(self.path.display().to_string(), e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io_error(parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StorageError::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::io_error(&self.path, e))
    }

    async fn update<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, Value>) + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load().await?;
        f(document.entry(self.namespace.clone()).or_default());
        self.persist(&document).await
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn get_value(&self, key: &str) -> StorageResult<Option<Value>> {
        let mut document = self.load().await?;
        Ok(document
            .remove(&self.namespace)
            .and_then(|mut entries| entries.remove(key)))
    }

    async fn save_value(&self, key: &str, value: Value) -> StorageResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
        })
        .await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.update(|entries| {
            entries.remove(key);
        })
        .await
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        let document = self.load().await?;
        Ok(document
            .get(&self.namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn has_permission(&self, debug: &DebugSink) -> StorageResult<()> {
        check_superuser(&self.authorities, debug)
    }
}
