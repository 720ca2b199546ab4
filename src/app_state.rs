use std::path::Path;
use std::sync::Arc;

use crate::{calendar_interface::CalendarInterface, config::Config, database::CalendarDatabase};

#[derive(Clone)]
pub struct AppState {
    pub calendar: CalendarInterface,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        ensure_database_dir(&config.database.url)?;

        // Initialize database
        let database = CalendarDatabase::new(&config.database.url).await?;
        database.init().await?;
        let database = Arc::new(database);

        let calendar = CalendarInterface::new(database);

        Ok(Self { calendar, config })
    }
}

/// SQLite creates the file on demand but not its parent directory.
fn ensure_database_dir(url: &str) -> anyhow::Result<()> {
    if url.contains(":memory:") {
        return Ok(());
    }
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
