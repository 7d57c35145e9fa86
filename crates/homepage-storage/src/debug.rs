//! Progress reporting side channel
//!
//! A [`DebugSink`] is a single-argument callback invoked at each notable step
//! of a migration run. It never influences control flow.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Cloneable progress callback
#[derive(Clone)]
pub struct DebugSink(Arc<dyn Fn(&str) + Send + Sync>);

impl DebugSink {
    /// Wrap a callback
    #[must_use]
    pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Sink forwarding every message to `tracing::debug!`
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|message| tracing::debug!(target: "homepage::debug", "{message}"))
    }

    /// Sink discarding every message
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Emit a message
    #[inline]
    pub fn emit(&self, message: impl AsRef<str>) {
        (self.0)(message.as_ref());
    }
}

impl Default for DebugSink {
    fn default() -> Self {
        Self::tracing()
    }
}

impl fmt::Debug for DebugSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DebugSink(..)")
    }
}

/// Collects debug messages in order, for front-ends that display the log
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl DebugLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink appending to this log
    #[must_use]
    pub fn sink(&self) -> DebugSink {
        let messages = Arc::clone(&self.messages);
        DebugSink::new(move |message| messages.lock().push(message.to_string()))
    }

    /// Snapshot of collected messages
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    /// Check whether any message contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().iter().any(|m| m.contains(needle))
    }
}
