//! Shared sluice record, state, and journal model types.
//!
//! This crate is dependency-light so both the state backend and the engine
//! (and any out-of-tree plugin crate) can use it.

pub mod journal;
pub mod record;
pub mod state;
pub mod value;

pub use record::{Record, RecordError};
pub use state::{ProjectName, ProjectState, StateBlob};
pub use value::Value;
