//! Output document shapes produced by the aggregation stage

use crate::domain::types::Timestamp;
use serde::Serialize;

/// One ambient pick in the output document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickResponse {
    pub article_name: String,
    #[serde(with = "rfc3339")]
    pub timestamp: Timestamp,
}

/// A picker with their ambient picks in timestamp order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickerWithPicks {
    pub picker_name: String,
    #[serde(with = "rfc3339")]
    pub active_since: Timestamp,
    pub picks: Vec<PickResponse>,
}

/// RFC3339 with the original offset, `Z` for UTC, fractional seconds only
/// when present
pub mod rfc3339 {
    use crate::domain::types::Timestamp;
    use chrono::SecondsFormat;
    use serde::Serializer;

    pub fn format(ts: &Timestamp) -> String {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn serialize<S>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format(ts))
    }
}
