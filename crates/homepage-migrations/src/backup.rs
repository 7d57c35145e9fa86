//! Backup snapshot keys
//!
//! A backup of `key` lives at `backup-<key>` in the same namespace. The prefix
//! is encoded here and nowhere else.

use crate::config::CONFIG_KEY;
use std::fmt;

/// Storage key of a backup snapshot, carrying the key it shadows
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackupKey {
    original: String,
}

impl BackupKey {
    /// Prefix of every backup key
    pub const PREFIX: &'static str = "backup-";

    /// Backup slot for `key`
    #[inline]
    #[must_use]
    pub fn for_key(key: impl Into<String>) -> Self {
        Self {
            original: key.into(),
        }
    }

    /// Recognise a stored key as a backup slot
    #[must_use]
    pub fn parse(storage_key: &str) -> Option<Self> {
        storage_key.strip_prefix(Self::PREFIX).map(Self::for_key)
    }

    /// Check if a stored key is a backup slot
    #[inline]
    #[must_use]
    pub fn is_backup(storage_key: &str) -> bool {
        storage_key.starts_with(Self::PREFIX)
    }

    /// Check if a stored key should be snapshotted by a backup
    #[must_use]
    pub fn should_back_up(storage_key: &str) -> bool {
        !storage_key.is_empty() && storage_key != CONFIG_KEY && !Self::is_backup(storage_key)
    }

    /// Key this snapshot restores to
    #[inline]
    #[must_use]
    pub fn original_key(&self) -> &str {
        &self.original
    }

    /// Key the snapshot is stored under
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{}{}", Self::PREFIX, self.original)
    }
}

impl fmt::Display for BackupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.original)
    }
}
