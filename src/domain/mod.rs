//! Domain models - pick events and the derived output document
//!
//! This module contains the canonical data types used throughout the system:
//! - `PickEvent` - one parsed input line (picker, article, quantity, time)
//! - `Picker` - worker identity, equal by id only
//! - `Article` / `TemperatureZone` - what was picked and where it is stored
//! - `PickerWithPicks` / `PickResponse` - the aggregated output shapes

pub mod response;
pub mod types;

// Re-export commonly used types at module level
pub use response::{PickResponse, PickerWithPicks};
pub use types::{Article, PickEvent, Picker, TemperatureZone, Timestamp};
