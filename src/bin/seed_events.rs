// Seeds a running GT-Cal server with the baseline events

use tracing::info;
use tracing_subscriber::EnvFilter;

use gt_cal::{config::Config, data_seeder::seed_baseline, sync::HttpRemote};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let remote = HttpRemote::from_config(&config.api);
    info!("Seeding events into {}", remote.base_url());

    let report = seed_baseline(&remote).await?;
    info!(
        created = report.created.len(),
        skipped = report.skipped,
        failed = report.failed,
        "Seeding finished"
    );

    Ok(())
}
