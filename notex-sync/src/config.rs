/// Configuration for the sync client
///
/// Read from `NOTEX_`-prefixed environment variables (and `.env`):
///
/// - `NOTEX_API_URL`: base URL of the API (default `http://localhost:8080`)
/// - `NOTEX_STORE_PATH`: JSON file for the local store; unset keeps it in memory
/// - `NOTEX_POLL_INTERVAL_SECS`: connectivity probe interval (default 5)
/// - `NOTEX_ACCESS_TOKEN`: bearer token used for API calls

use config::{Config, ConfigError, Environment, Map};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub api_url: String,

    #[serde(default)]
    pub store_path: Option<PathBuf>,

    pub poll_interval_secs: u64,

    #[serde(default)]
    pub access_token: Option<String>,
}

impl SyncConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::build(None)
    }

    /// Loads configuration from explicit `NOTEX_*` pairs instead of the environment
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: Map<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::build(Some(map))
    }

    fn build(source: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("api_url", "http://localhost:8080")?
            .set_default("poll_interval_secs", 5)?
            .add_source(
                Environment::with_prefix("NOTEX")
                    .try_parsing(true)
                    .source(source),
            )
            .build()?;

        let parsed: SyncConfig = config.try_deserialize()?;

        if parsed.poll_interval_secs == 0 {
            return Err(ConfigError::Message(
                "NOTEX_POLL_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(SyncConfig {
            api_url: parsed.api_url.trim_end_matches('/').to_string(),
            access_token: parsed.access_token.filter(|t| !t.is_empty()),
            ..parsed
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
