//! Data models for the StudySpot Live service.
//!
//! Field names serialize in camelCase to match the document layout in the remote store.

mod document;
mod spot;
mod state;

pub use document::*;
pub use spot::*;
pub use state::*;
