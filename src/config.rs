use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;
use crate::remote::RemoteConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBackend {
    Postgrest,
    /// In-process tables, for local runs without the hosted service.
    Memory,
}

pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub backend: RemoteBackend,
    pub remote: Option<RemoteConfig>,
    pub admin_password: String,
    pub session_database_url: String,
    /// How long an admin login stays valid in the session database.
    pub session_ttl: Duration,
    pub bind_addr: SocketAddr,
}

impl CatalogConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let backend = match env::var("REMOTE_BACKEND").as_deref() {
            Ok("memory") => RemoteBackend::Memory,
            Ok("postgrest") | Err(_) => RemoteBackend::Postgrest,
            Ok(other) => {
                return Err(AppError::Config(format!("Unknown REMOTE_BACKEND: {}", other)));
            }
        };

        let remote = match backend {
            RemoteBackend::Postgrest => Some(RemoteConfig::new_from_env()?),
            RemoteBackend::Memory => None,
        };

        let admin_password = env::var("ADMIN_PASSWORD")
            .map_err(|_| AppError::Config("ADMIN_PASSWORD is not set".to_string()))?;
        if admin_password.is_empty() {
            return Err(AppError::Config("ADMIN_PASSWORD must not be empty".to_string()));
        }

        let session_database_url = env::var("SESSION_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://sessions.db?mode=rwc".to_string());

        let session_ttl = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => parse_ttl(&raw)?,
            Err(_) => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid BIND_ADDR: {}", e)))?;

        Ok(Self {
            backend,
            remote,
            admin_password,
            session_database_url,
            session_ttl,
            bind_addr,
        })
    }
}

fn parse_ttl(raw: &str) -> Result<Duration, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::Config(format!(
            "SESSION_TTL_SECS must be a positive number of seconds, got {:?}",
            raw
        ))),
    }
}
