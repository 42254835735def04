//! Aggregation stage - turns collected pick events into the output document
//!
//! Pure and deterministic: the result depends only on the set of events,
//! never on the order the consumer pool happened to deliver them in.

use crate::domain::response::{PickResponse, PickerWithPicks};
use crate::domain::types::{PickEvent, Picker};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// Group ambient picks by picker and order everything
///
/// - chilled picks are dropped
/// - pickers are grouped by id and ordered by `(active_since, id)`
/// - picks within a picker are ordered by timestamp, ties by event id
/// - article names are ASCII-uppercased
///
/// A picker whose name or `active_since` differs between events is reported
/// with the values from its earliest pick.
pub fn aggregate(events: Vec<PickEvent>) -> Vec<PickerWithPicks> {
    let mut ambient: Vec<PickEvent> = events.into_iter().filter(PickEvent::is_ambient).collect();
    ambient.sort_by(by_timestamp_then_id);

    // Entry keeps the first inserted key, i.e. the picker of the earliest pick
    let mut groups: FxHashMap<Picker, Vec<PickResponse>> = FxHashMap::default();
    for event in ambient {
        let response = PickResponse {
            article_name: event.article.name.to_ascii_uppercase(),
            timestamp: event.timestamp,
        };
        groups.entry(event.picker).or_default().push(response);
    }

    let mut grouped: Vec<(Picker, Vec<PickResponse>)> = groups.into_iter().collect();
    grouped.sort_by(|(a, _), (b, _)| {
        a.active_since.cmp(&b.active_since).then_with(|| a.id.cmp(&b.id))
    });

    grouped
        .into_iter()
        .map(|(picker, picks)| PickerWithPicks {
            picker_name: picker.name,
            active_since: picker.active_since,
            picks,
        })
        .collect()
}

fn by_timestamp_then_id(a: &PickEvent, b: &PickEvent) -> Ordering {
    a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id))
}
