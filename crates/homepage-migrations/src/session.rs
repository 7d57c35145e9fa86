//! Migration session state machine
//!
//! Governs when the runner is driven by a front-end:
//!
//! ```text
//! checking ──► checked
//!    │
//!    └──► pending(runner) ──► show-info ──► migrating ──► success
//!                 │               ▲             │
//!                 │               └── error ────┘
//!                 └──► app-out-of-date   (storage newer than the app)
//! ```

use crate::error::{MigrationError, MigrationResult};
use crate::runner::MigrationsRunner;
use crate::step::MigrationStep;
use homepage_storage::{DebugLog, Storage};
use std::sync::Arc;

/// Outcome of the startup check
#[derive(Debug)]
pub enum MigrationsState {
    /// Check not finished yet
    Checking,
    /// Storage and app versions differ
    Pending(MigrationsRunner),
    /// Nothing to do
    Checked,
}

/// Check whether the namespace needs a migration session
///
/// # Errors
/// Any error of [`MigrationsRunner::init`]
pub async fn check_migrations(
    storage: Arc<dyn Storage>,
    steps: Vec<MigrationStep>,
) -> MigrationResult<MigrationsState> {
    let runner = MigrationsRunner::init(storage, steps).await?;

    if runner.has_pending_migrations() {
        Ok(MigrationsState::Pending(runner))
    } else {
        Ok(MigrationsState::Checked)
    }
}

/// State of a pending session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogState {
    /// Waiting for the user to start (or retry) the run
    ShowInfo,
    /// Run in progress
    Migrating,
    /// Run completed
    Success,
    /// Storage schema is newer than the app; nothing can be done here
    AppOutOfDate,
}

impl DialogState {
    /// Starting state for `runner`
    #[must_use]
    pub fn initial(runner: &MigrationsRunner) -> Self {
        let current = runner.current_storage_version();
        let last = runner.last_migration_version();

        if current == last {
            Self::Success
        } else if current > last {
            Self::AppOutOfDate
        } else {
            Self::ShowInfo
        }
    }

    /// Label of the primary action, `None` when there is none
    #[must_use]
    pub fn action_text(self) -> Option<&'static str> {
        match self {
            Self::ShowInfo => Some("Migrate instance"),
            Self::Migrating => Some("Migrating..."),
            Self::Success => Some("Continue to the App"),
            Self::AppOutOfDate => None,
        }
    }

    /// Check if no transition leaves this state
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: DialogState) -> Vec<DialogState> {
    use DialogState::{AppOutOfDate, Migrating, ShowInfo, Success};
    match from {
        ShowInfo => vec![Migrating],
        Migrating => vec![Success, ShowInfo],
        Success | AppOutOfDate => vec![],
    }
}

/// Validate a transition
///
/// # Errors
/// `MigrationError::IllegalTransition`
pub fn validate_transition(from: DialogState, to: DialogState) -> MigrationResult<()> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(MigrationError::IllegalTransition { from, to })
    }
}

/// One pending migration session, collecting the debug log for display
#[derive(Debug)]
pub struct MigrationSession {
    runner: MigrationsRunner,
    state: DialogState,
    log: DebugLog,
    last_error: Option<String>,
}

impl MigrationSession {
    /// Start a session; progress goes to the session log
    #[must_use]
    pub fn new(runner: MigrationsRunner) -> Self {
        let log = DebugLog::new();
        let state = DialogState::initial(&runner);

        Self {
            runner: runner.with_debug(log.sink()),
            state,
            log,
            last_error: None,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> DialogState {
        self.state
    }

    /// Messages emitted so far
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.log.messages()
    }

    /// Error of the last failed attempt
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Check if the app may continue
    #[inline]
    #[must_use]
    pub fn can_continue(&self) -> bool {
        self.state == DialogState::Success
    }

    /// Explanation shown before the run
    #[must_use]
    pub fn summary(&self) -> String {
        let current = self.runner.current_storage_version();
        let last = self.runner.last_migration_version();

        if self.state == DialogState::AppOutOfDate {
            format!(
                "The database version ({current}) is greater than the app version ({last}), cannot continue. \
                 Please contact the administrator to update the app."
            )
        } else {
            format!(
                "The app needs to run pending migrations (from version {current} to version {last}) in order to continue. \
                 This may take a long time, make sure the process is not interrupted."
            )
        }
    }

    /// Run (or retry) the migrations
    ///
    /// A failing run returns the session to `ShowInfo` so it can be retried;
    /// the error is written to the session log.
    ///
    /// # Errors
    /// `MigrationError::IllegalTransition` when called outside `ShowInfo`
    pub async fn start(&mut self) -> MigrationResult<DialogState> {
        self.transition(DialogState::Migrating)?;

        match self.runner.execute().await {
            Ok(_) => {
                self.last_error = None;
                self.transition(DialogState::Success)?;
            }
            Err(error) => {
                let sink = self.log.sink();
                sink.emit("---");
                sink.emit(format!("Error: {error}"));
                sink.emit(
                    "There has been an error. You can either retry or contact your administrator \
                     if you think there has been an un recoverable error",
                );
                self.last_error = Some(error.to_string());
                self.transition(DialogState::ShowInfo)?;
            }
        }

        Ok(self.state)
    }

    fn transition(&mut self, to: DialogState) -> MigrationResult<()> {
        validate_transition(self.state, to)?;
        tracing::debug!(from = ?self.state, to = ?to, "migration session transition");
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_info_only_starts_migrating() {
        assert!(validate_transition(DialogState::ShowInfo, DialogState::Migrating).is_ok());
        assert!(validate_transition(DialogState::ShowInfo, DialogState::Success).is_err());
    }

    #[test]
    fn migrating_ends_in_success_or_retry() {
        assert!(validate_transition(DialogState::Migrating, DialogState::Success).is_ok());
        assert!(validate_transition(DialogState::Migrating, DialogState::ShowInfo).is_ok());
        assert!(validate_transition(DialogState::Migrating, DialogState::AppOutOfDate).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(DialogState::Success.is_terminal());
        assert!(DialogState::AppOutOfDate.is_terminal());
        assert!(!DialogState::ShowInfo.is_terminal());
        assert_eq!(DialogState::AppOutOfDate.action_text(), None);
    }
}
