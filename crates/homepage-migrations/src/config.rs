//! Persisted schema version record

use serde::{Deserialize, Serialize};

/// Storage key holding the [`SchemaConfig`]
pub const CONFIG_KEY: &str = "migrations";

/// Schema version of a storage namespace
///
/// `version` is the last fully applied migration. `migration` is present only
/// while a run is in flight or after a run failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Last successfully completed migration version
    pub version: u32,
    /// In-progress marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration: Option<MigrationMarker>,
}

/// Marker for a run targeting `version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationMarker {
    /// Target version of the run
    pub version: u32,
    /// Failure recorded by the run, `"<step name>: <error>"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaConfig {
    /// Config at `version` with no marker
    #[inline]
    #[must_use]
    pub fn at(version: u32) -> Self {
        Self {
            version,
            migration: None,
        }
    }

    /// Same config flagged as migrating towards `target`
    #[must_use]
    pub fn in_progress(&self, target: u32) -> Self {
        Self {
            version: self.version,
            migration: Some(MigrationMarker {
                version: target,
                error: None,
            }),
        }
    }

    /// Same config flagged with a failed run towards `target`
    #[must_use]
    pub fn failed(&self, target: u32, error: impl Into<String>) -> Self {
        Self {
            version: self.version,
            migration: Some(MigrationMarker {
                version: target,
                error: Some(error.into()),
            }),
        }
    }

    /// Check if a run was started and never completed
    #[inline]
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.migration.is_some()
    }

    /// Last recorded failure, if any
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.migration.as_ref().and_then(|m| m.error.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_omits_empty_marker() {
        assert_eq!(serde_json::to_value(SchemaConfig::at(2)).unwrap(), json!({ "version": 2 }));

        let failed = SchemaConfig::at(1).failed(3, "step: boom");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({ "version": 1, "migration": { "version": 3, "error": "step: boom" } })
        );
        assert_eq!(failed.last_error(), Some("step: boom"));
    }

    #[test]
    fn decodes_marker_without_error() {
        let config: SchemaConfig =
            serde_json::from_value(json!({ "version": 0, "migration": { "version": 2 } })).unwrap();
        assert!(config.is_in_progress());
        assert_eq!(config.last_error(), None);
        assert_eq!(config, SchemaConfig::at(0).in_progress(2));
    }
}
