//! Observable state published by the view-model.

use serde::Serialize;

use super::StudySpot;

/// Snapshot of what the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotState {
    pub spots: Vec<StudySpot>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    /// Operations currently running; `is_loading` mirrors `in_flight > 0`.
    #[serde(skip)]
    pub(crate) in_flight: usize,
    /// Ticket of the fetch whose result is currently in `spots`.
    #[serde(skip)]
    pub(crate) applied_fetch: u64,
    /// Newest fetch ticket known when `error_message` was set.
    #[serde(skip)]
    pub(crate) error_fetch: u64,
}
