use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parley_api::{Backend, CallableClient};

/// Settings read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub functions_url: Option<String>,
    pub auth_token: Option<String>,
    pub user_id: String,
    pub language: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("PARLEY_DB_PATH").unwrap_or_else(|_| "parley.db".into());
        let user_id = std::env::var("PARLEY_USER_ID").context("PARLEY_USER_ID must be set")?;
        let language = std::env::var("PARLEY_LANGUAGE").unwrap_or_else(|_| "en".into());
        let timeout_secs: u64 = std::env::var("PARLEY_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .context("PARLEY_HTTP_TIMEOUT_SECS must be a number of seconds")?;

        Ok(Self {
            db_path: PathBuf::from(db_path),
            functions_url: std::env::var("PARLEY_FUNCTIONS_URL").ok().filter(|s| !s.is_empty()),
            auth_token: std::env::var("PARLEY_AUTH_TOKEN").ok().filter(|s| !s.is_empty()),
            user_id,
            language,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Client for the remote functions. Commands that stay local never call
    /// it, so a missing base URL only matters to the ones that do.
    pub fn backend(&self) -> Result<Arc<dyn Backend>> {
        let base_url = self.functions_url.clone().unwrap_or_default();
        let client = CallableClient::new(base_url, self.auth_token.clone(), self.http_timeout)?;
        Ok(Arc::new(client))
    }
}
