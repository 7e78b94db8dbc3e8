//! Server configuration read from the environment

use std::net::SocketAddr;
use std::time::Duration;

use notesphere_core::store::StoreConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://.notesphere-data/notesphere.db";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub port: u16,
    /// Allow any origin, method and header
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            port: 8081,
            cors_permissive: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("NOTESPHERE_DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.database_url),
            max_connections: env_number(&lookup, "NOTESPHERE_MAX_CONNECTIONS")
                .unwrap_or(defaults.max_connections),
            acquire_timeout: env_number(&lookup, "NOTESPHERE_ACQUIRE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
            port: env_number(&lookup, "NOTESPHERE_PORT").unwrap_or(defaults.port),
            cors_permissive: env_flag(&lookup, "NOTESPHERE_CORS_PERMISSIVE", defaults.cors_permissive),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.database_url.clone(),
            ..StoreConfig::default()
        }
        .with_max_connections(self.max_connections)
        .with_acquire_timeout(self.acquire_timeout)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn env_number<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match lookup(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}
