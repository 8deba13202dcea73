//! Opaque store records and read options.

use serde_json::{Map, Value};

/// Field map of a stored document.
pub type Fields = Map<String, Value>;

/// Document field holding the display name.
pub const FIELD_SPOT_NAME: &str = "spotName";
/// Document field holding the status label.
pub const FIELD_CURRENT_STATUS: &str = "currentStatus";
/// Document field holding the RFC 3339 timestamp of the last write.
pub const FIELD_LAST_UPDATED: &str = "lastUpdated";

/// A document as returned by the remote store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Read consistency requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Server-authoritative read; fails when the server cannot be reached.
    Server,
    /// Best available data, possibly served from a local replica.
    Default,
}

impl ReadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadSource::Server => "server",
            ReadSource::Default => "default",
        }
    }
}
