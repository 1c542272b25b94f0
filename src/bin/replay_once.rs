use std::time::Duration;
use tracing::{info, warn};
use worklog_sync::AppState;
use worklog_sync::application::ports::ConnectivityProbe;
use worklog_sync::infrastructure::remote::HttpHealthProbe;
use worklog_sync::shared::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    worklog_sync::init_logging();

    let config = AppConfig::from_env();
    info!(database = %config.database.url, api = %config.remote.base_url, "replay_once starting");

    let state = AppState::new(config.clone()).await?;
    let probe = HttpHealthProbe::new(
        &config.remote.base_url,
        Duration::from_secs(config.connectivity.probe_timeout_secs),
    )?;
    let online = probe.is_reachable().await;
    state.connectivity.set_online(online);
    if !online {
        warn!("remote API unreachable, nothing replayed");
    }

    let report = state.queue.sync_now().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let quarantined = state.queue.quarantined().await?;
    if !quarantined.is_empty() {
        warn!(count = quarantined.len(), "quarantined actions need attention");
    }

    state.db_pool.close().await;
    Ok(())
}
