//! Home Page CLI
//!
//! Drives the migration engine and the landing page repository against a
//! JSON file store. The `homepage` binary parses [`cli::build_cli`], loads
//! [`config::AppConfig`] and dispatches to [`commands`].

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use cli::build_cli;
pub use config::AppConfig;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
