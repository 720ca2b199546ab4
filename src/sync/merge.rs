use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::Event;

/// Merges the local baseline with the remote list.
///
/// Records are matched on (title, date). The first copy of a key wins, and
/// baseline records come first, so a baseline record keeps its id and
/// counters for the rest of the session.
pub fn merge_events(baseline: Vec<Event>, remote: Vec<Event>) -> Vec<Event> {
    let mut seen: HashSet<(String, NaiveDate)> = HashSet::new();

    baseline
        .into_iter()
        .chain(remote)
        .filter(|event| seen.insert((event.title.clone(), event.date)))
        .collect()
}
