// Data seeder - pushes the baseline events to the remote API

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::models::{Event, NewEvent};
use crate::sync::{baseline_events, RemoteApi, RemoteResult};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<Event>,
    pub skipped: usize,
    pub failed: usize,
}

/// Creates every baseline event the remote does not have yet, matching on
/// (title, date). A failed create is logged and counted, not fatal.
pub async fn seed_baseline<R: RemoteApi + ?Sized>(remote: &R) -> RemoteResult<SeedReport> {
    let existing: HashSet<(String, NaiveDate)> = remote
        .list_events()
        .await?
        .into_iter()
        .map(|event| (event.title, event.date))
        .collect();

    let mut report = SeedReport::default();
    for event in baseline_events() {
        if existing.contains(&(event.title.clone(), event.date)) {
            report.skipped += 1;
            continue;
        }

        match remote.create_event(&NewEvent::from(&event)).await {
            Ok(created) => {
                info!("Seeded {} ({}) as {}", created.title, created.date, created.id);
                report.created.push(created);
            }
            Err(err) => {
                warn!(title = %event.title, error = %err, "Failed to seed event");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
