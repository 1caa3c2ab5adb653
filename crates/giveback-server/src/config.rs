use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    /// Reads `GIVEBACK_*` variables. Call after `.env` has been loaded.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("GIVEBACK_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!(
                "GIVEBACK_JWT_SECRET is unset or still a placeholder; \
                 it must match the secret of the service that issues tokens"
            );
        }

        let db_path: PathBuf = std::env::var("GIVEBACK_DB_PATH")
            .unwrap_or_else(|_| "giveback.db".into())
            .into();
        let host = std::env::var("GIVEBACK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("GIVEBACK_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("GIVEBACK_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .context("GIVEBACK_HOST must be an IP address")?;

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
        })
    }
}
