//! Shared types for pick events

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Offset-aware instant as it appears on the wire
pub type Timestamp = DateTime<FixedOffset>;

/// Storage temperature classification of an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureZone {
    Ambient,
    Chilled,
}

impl TemperatureZone {
    pub fn as_str(&self) -> &str {
        match self {
            TemperatureZone::Ambient => "ambient",
            TemperatureZone::Chilled => "chilled",
        }
    }
}

impl std::fmt::Display for TemperatureZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Worker performing picks
///
/// Equality and hashing use `id` only: two pickers with the same id are the
/// same entity even if name or active_since differ between events. Grouping
/// in the aggregation stage relies on this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Picker {
    pub id: String,
    pub name: String,
    pub active_since: Timestamp,
}

impl PartialEq for Picker {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Picker {}

impl Hash for Picker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub name: String,
    pub temperature_zone: TemperatureZone,
}

/// One line of the input stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickEvent {
    pub id: String,
    pub timestamp: Timestamp,
    pub picker: Picker,
    pub article: Article,
    pub quantity: i64,
}

impl PickEvent {
    /// Parse one input line. Returns `None` for anything that is not a
    /// complete pick event.
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line).ok()
    }

    #[inline]
    pub fn is_ambient(&self) -> bool {
        self.article.temperature_zone == TemperatureZone::Ambient
    }
}
