//! A job record joined with the live data fetched for it.

use serde::{Serialize, Serializer};

use super::record::JobRecord;

/// Outcome of enriching one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    /// The flow service answered with a `data` payload.
    Loaded(serde_json::Value),
    /// The flow service answered, but without `data`.
    Empty,
    /// Every attempt failed, or the page deadline passed first.
    Failed { reason: String, attempts: u32 },
}

impl Enrichment {
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Loaded(value) => Some(value),
            Self::Empty | Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Build from the parsed flow-service response body.
    ///
    /// An absent or `null` `data` field is a successful empty enrichment.
    pub fn from_response(mut body: serde_json::Value) -> Self {
        match body.get_mut("data").map(serde_json::Value::take) {
            Some(serde_json::Value::Null) | None => Self::Empty,
            Some(data) => Self::Loaded(data),
        }
    }
}

/// Serializes as the payload itself, or `null` when there is none.
impl Serialize for Enrichment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.payload() {
            Some(value) => value.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// One row of the enriched listing: `{job, dataset}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedResult {
    #[serde(rename = "job")]
    pub record: JobRecord,
    #[serde(rename = "dataset")]
    pub enrichment: Enrichment,
}

impl PairedResult {
    pub fn new(record: JobRecord, enrichment: Enrichment) -> Self {
        Self { record, enrichment }
    }
}
