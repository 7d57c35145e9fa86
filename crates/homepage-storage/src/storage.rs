//! Storage collaborator contract
//!
//! [`Storage`] moves raw JSON values and is shared as `Arc<dyn Storage>`.
//! Typed access goes through the blanket [`StorageExt`] helpers.

use crate::debug::DebugSink;
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Authority a principal needs to run migrations
pub const SUPERUSER_AUTHORITY: &str = "ALL";

/// Async key/value store scoped to one namespace
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read raw value, `None` when the key is absent
    async fn get_value(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Write raw value, replacing any previous one
    async fn save_value(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Remove key; removing a missing key succeeds
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List every key in the namespace
    async fn get_keys(&self) -> StorageResult<Vec<String>>;

    /// Fail with [`StorageError::PermissionDenied`] unless the current
    /// principal may run migrations
    async fn has_permission(&self, debug: &DebugSink) -> StorageResult<()>;
}

/// Typed helpers over any [`Storage`]
#[async_trait]
pub trait StorageExt: Storage {
    /// Read and decode a value
    async fn get_object<T>(&self, key: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get_value(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::serialization(key, e)),
        }
    }

    /// Read a value, creating the key with `default` when absent
    async fn get_or_create<T>(&self, key: &str, default: T) -> StorageResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        if let Some(value) = self.get_object::<T>(key).await? {
            return Ok(value);
        }

        tracing::debug!(key, "creating missing key with default value");
        self.save_object(key, &default).await?;
        Ok(default)
    }

    /// Encode and write a value
    async fn save_object<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(|e| StorageError::serialization(key, e))?;
        self.save_value(key, value).await
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Shared permission rule used by the bundled backends
pub(crate) fn check_superuser(authorities: &[String], debug: &DebugSink) -> StorageResult<()> {
    debug.emit("Check that current user is superadmin");

    if authorities.iter().any(|a| a == SUPERUSER_AUTHORITY) {
        Ok(())
    } else {
        Err(StorageError::PermissionDenied(format!(
            "Only a user with authority {SUPERUSER_AUTHORITY} can run this migration"
        )))
    }
}
