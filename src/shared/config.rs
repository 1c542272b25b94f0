use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub connectivity: ConnectivityConfig,
    pub sync: SyncConfig,
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    /// Failed attempts after which the head action is quarantined. `None` keeps
    /// strict fail-fast behaviour.
    #[serde(default)]
    pub quarantine_after: Option<u32>,
    /// Zero disables the cross-process lease.
    pub lease_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Age after which unreferenced temporary mirror entries are pruned.
    #[serde(default)]
    pub temporary_ttl_hours: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 1,
            },
            remote: RemoteConfig {
                base_url: "http://localhost:8000/api".to_string(),
                api_token: None,
                request_timeout_secs: 30,
            },
            connectivity: ConnectivityConfig {
                probe_interval_secs: 15,
                probe_timeout_secs: 5,
            },
            sync: SyncConfig {
                auto_sync: true,
                quarantine_after: None,
                lease_ttl_secs: 120,
            },
            mirror: MirrorConfig {
                temporary_ttl_hours: None,
            },
        }
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("worklog-sync");
    format!("sqlite:{}?mode=rwc", dir.join("offline.db").display())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("WORKLOG_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Ok(v) = std::env::var("WORKLOG_DATABASE_MAX_CONNECTIONS") {
            if let Some(value) = parse_u64(&v) {
                cfg.database.max_connections = value.clamp(1, u32::MAX as u64) as u32;
            }
        }

        if let Ok(v) = std::env::var("WORKLOG_API_BASE_URL") {
            let trimmed = v.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                cfg.remote.base_url = trimmed.to_string();
            }
        }
        if let Ok(v) = std::env::var("WORKLOG_API_TOKEN") {
            cfg.remote.api_token = Some(v.trim().to_string()).filter(|token| !token.is_empty());
        }
        if let Ok(v) = std::env::var("WORKLOG_API_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.request_timeout_secs = value.max(1);
            }
        }

        if let Ok(v) = std::env::var("WORKLOG_PROBE_INTERVAL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.connectivity.probe_interval_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("WORKLOG_PROBE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.connectivity.probe_timeout_secs = value.max(1);
            }
        }

        if let Ok(v) = std::env::var("WORKLOG_SYNC_AUTO") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("WORKLOG_SYNC_QUARANTINE_AFTER") {
            // 0 turns the quarantine policy off
            cfg.sync.quarantine_after = parse_u64(&v)
                .filter(|value| *value > 0)
                .map(|value| value.min(u32::MAX as u64) as u32);
        }
        if let Ok(v) = std::env::var("WORKLOG_SYNC_LEASE_TTL_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.lease_ttl_secs = value;
            }
        }

        if let Ok(v) = std::env::var("WORKLOG_MIRROR_TEMP_TTL_HOURS") {
            cfg.mirror.temporary_ttl_hours = parse_u64(&v).filter(|value| *value > 0);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if !self.remote.base_url.starts_with("http://")
            && !self.remote.base_url.starts_with("https://")
        {
            return Err(format!(
                "Remote base_url must be an http(s) URL: {}",
                self.remote.base_url
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            return Err("Remote request_timeout_secs must be greater than 0".to_string());
        }
        if self.connectivity.probe_interval_secs == 0 {
            return Err("Connectivity probe_interval_secs must be greater than 0".to_string());
        }
        if self.sync.lease_ttl_secs > 0
            && self.sync.lease_ttl_secs <= self.remote.request_timeout_secs
        {
            return Err(format!(
                "Sync lease_ttl_secs ({}) must exceed remote request_timeout_secs ({})",
                self.sync.lease_ttl_secs, self.remote.request_timeout_secs
            ));
        }
        if let Some(0) = self.sync.quarantine_after {
            return Err("Sync quarantine_after must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
