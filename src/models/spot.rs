//! Study spot model and status labels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Document, Fields, FIELD_CURRENT_STATUS, FIELD_LAST_UPDATED, FIELD_SPOT_NAME};
use crate::errors::StoreError;

/// Status shown for documents that carry no status at all.
pub const STATUS_UNKNOWN: &str = "Unknown";

/// Occupancy of a study spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotStatus {
    #[serde(rename = "Empty")]
    Empty,
    #[serde(rename = "Getting Full")]
    GettingFull,
    #[serde(rename = "Packed")]
    Packed,
}

impl SpotStatus {
    pub const ALL: [SpotStatus; 3] = [SpotStatus::Empty, SpotStatus::GettingFull, SpotStatus::Packed];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpotStatus::Empty => "Empty",
            SpotStatus::GettingFull => "Getting Full",
            SpotStatus::Packed => "Packed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Empty" => Some(SpotStatus::Empty),
            "Getting Full" => Some(SpotStatus::GettingFull),
            "Packed" => Some(SpotStatus::Packed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named study location and its last reported occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySpot {
    pub id: String,
    pub spot_name: String,
    /// Free-form label; the store does not enforce the closed set.
    pub current_status: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl StudySpot {
    /// Normalize a stored document into a spot.
    ///
    /// Missing fields take defaults; fields of the wrong type fail the document.
    pub fn from_document(document: &Document) -> Result<Self, StoreError> {
        if document.id.is_empty() {
            return Err(StoreError::Malformed("document has an empty id".to_string()));
        }

        let spot_name = string_field(&document.fields, FIELD_SPOT_NAME)?.unwrap_or_default();
        let current_status = string_field(&document.fields, FIELD_CURRENT_STATUS)?
            .unwrap_or_else(|| STATUS_UNKNOWN.to_string());
        let last_updated = document
            .fields
            .get(FIELD_LAST_UPDATED)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Self {
            id: document.id.clone(),
            spot_name,
            current_status,
            last_updated,
        })
    }

    /// The status as a known label, if it is one.
    pub fn status(&self) -> Option<SpotStatus> {
        SpotStatus::from_str(&self.current_status)
    }
}

/// Fields written when a spot is created.
pub fn new_spot_fields(spot_name: &str, now: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_SPOT_NAME.to_string(), Value::from(spot_name));
    fields.insert(
        FIELD_CURRENT_STATUS.to_string(),
        Value::from(SpotStatus::Empty.as_str()),
    );
    fields.insert(FIELD_LAST_UPDATED.to_string(), Value::from(now.to_rfc3339()));
    fields
}

/// Fields written when a spot's status changes.
pub fn status_update_fields(status: &str, now: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(FIELD_CURRENT_STATUS.to_string(), Value::from(status));
    fields.insert(FIELD_LAST_UPDATED.to_string(), Value::from(now.to_rfc3339()));
    fields
}

fn string_field(fields: &Fields, name: &str) -> Result<Option<String>, StoreError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(StoreError::Malformed(format!(
            "field {} is not a string: {}",
            name, other
        ))),
    }
}
