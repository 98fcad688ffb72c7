use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub session_ttl: Duration,
    pub store: StoreKind,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("HEARTH_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HEARTH_JWT_SECRET is unset or still a placeholder");
        }

        let db_path: PathBuf = var("HEARTH_DB_PATH")
            .unwrap_or_else(|| "hearth.db".into())
            .into();
        let host = var("HEARTH_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("HEARTH_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("HEARTH_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let session_hours: i64 = var("HEARTH_SESSION_HOURS")
            .unwrap_or_else(|| "168".into()) // 7 days
            .parse()
            .context("HEARTH_SESSION_HOURS must be a whole number of hours")?;
        if session_hours <= 0 {
            bail!("HEARTH_SESSION_HOURS must be positive");
        }

        let store = match var("HEARTH_STORE").as_deref().unwrap_or("sqlite") {
            "sqlite" => StoreKind::Sqlite,
            "memory" => StoreKind::Memory,
            other => bail!("HEARTH_STORE must be 'sqlite' or 'memory', got '{}'", other),
        };

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            session_ttl: Duration::hours(session_hours),
            store,
        })
    }
}
