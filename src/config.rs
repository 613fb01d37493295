//! # Configuration Management
//!
//! Configuration comes from the environment ("12-factor app"), with an
//! optional `.env` file loaded first.
//!
//! ## Environment Variables
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8080)
//! - `RP_ID`: WebAuthn Relying Party ID, the bare domain (default: localhost)
//! - `RP_NAME`: Human-readable name for your service (default: Passkey Demo)
//! - `STORE_BACKEND`: `sqlite`, `file` or `memory` (default: sqlite)
//! - `DATABASE_URL`: SQLite connection string for the sqlite backend
//! - `CRED_STORE_PATH`: JSON file for the file backend
//!
//! There is no origin setting: the expected origin of each ceremony is
//! taken from the request that runs it.

use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Where credential records and the session key material are persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// SQLite database at `DATABASE_URL`
    Sqlite,
    /// One JSON document at `CRED_STORE_PATH`
    File,
    /// Process memory; everything is lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unknown STORE_BACKEND '{other}' (expected sqlite, file or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Must match the domain the app is served from, without scheme or port
    pub rp_id: String,

    /// Shown to users during passkey creation
    pub rp_name: String,

    pub store_backend: StoreBackend,

    /// Format: "sqlite:filename.db?mode=rwc" (read, write, create)
    pub database_url: String,

    pub cred_store_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// ## Example .env file
    /// ```text
    /// HOST=127.0.0.1
    /// PORT=8080
    /// RP_ID=localhost
    /// RP_NAME=Passkey Demo
    /// STORE_BACKEND=sqlite
    /// DATABASE_URL=sqlite:passkey.db?mode=rwc
    /// ```
    pub fn from_env() -> Result<Self> {
        // dotenvy doesn't error if the file is missing
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            rp_id: env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string()),
            rp_name: env::var("RP_NAME").unwrap_or_else(|_| "Passkey Demo".to_string()),
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "sqlite".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:passkey.db?mode=rwc".to_string()),
            cred_store_path: env::var("CRED_STORE_PATH")
                .unwrap_or_else(|_| "credentials.json".to_string())
                .into(),
        })
    }

    /// `host:port`, as taken by `tokio::net::TcpListener::bind()`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
