pub mod check;
pub mod failures;
pub mod projects;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use sluice_engine::DirectoryCatalog;
use sluice_state::SqliteStateBackend;

/// Filesystem locations shared by every command.
pub struct Paths {
    pub root: PathBuf,
    pub state: PathBuf,
}

impl Paths {
    pub fn catalog(&self) -> DirectoryCatalog {
        DirectoryCatalog::new(self.root.clone())
    }

    pub fn backend(&self) -> Result<SqliteStateBackend> {
        SqliteStateBackend::open(&self.state)
            .with_context(|| format!("Failed to open state database: {}", self.state.display()))
    }
}
