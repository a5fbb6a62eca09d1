//! Project state persistence for the sluice engine.
//!
//! Provides the [`StateBackend`] trait and a [`SqliteStateBackend`]
//! implementation for per-project state blobs, the failure journal, and
//! run history.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod sqlite;

pub use backend::StateBackend;
pub use error::StateError;
pub use sqlite::{failure_note, SqliteStateBackend};
