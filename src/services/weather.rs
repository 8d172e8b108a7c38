use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::core::error::{JournalError, Result};
use crate::http_client::{endpoint, ServiceClient};

const SERVICE: &str = "weather";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedWeather {
    city_id: String,
    fetched_at: DateTime<Utc>,
    body: Value,
}

/// Current conditions from OpenWeatherMap, cached for a short window.
///
/// With a cache file the window spans processes; otherwise it lasts as long
/// as the client.
pub struct WeatherClient {
    http: ServiceClient,
    config: WeatherConfig,
    cache_file: Option<PathBuf>,
    cache: Mutex<Option<CachedWeather>>,
}

impl WeatherClient {
    pub fn new(http: ServiceClient, config: WeatherConfig) -> Self {
        Self {
            http,
            config,
            cache_file: None,
            cache: Mutex::new(None),
        }
    }

    pub fn with_cache_file(mut self, path: PathBuf) -> Self {
        self.cache_file = Some(path);
        self
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.cache_ttl_secs)
    }

    fn is_fresh(&self, entry: &CachedWeather) -> bool {
        entry.city_id == self.config.city_id
            && (Utc::now() - entry.fetched_at)
                .to_std()
                .map_or(false, |age| age < self.ttl())
    }

    fn read_cache_file(&self) -> Option<CachedWeather> {
        let path = self.cache_file.as_ref()?;
        let json = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring unreadable weather cache");
                None
            }
        }
    }

    fn write_cache_file(&self, entry: &CachedWeather) {
        let Some(path) = &self.cache_file else {
            return;
        };
        let written = serde_json::to_string(entry)
            .map_err(JournalError::from)
            .and_then(|json| std::fs::write(path, json).map_err(JournalError::from));
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "failed to write weather cache");
        }
    }

    /// Upstream JSON for the configured city.
    pub async fn current(&self) -> Result<Value> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = self.read_cache_file();
        }
        if let Some(entry) = &*cache {
            if self.is_fresh(entry) {
                debug!("weather served from cache");
                return Ok(entry.body.clone());
            }
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| JournalError::Config("weather api_key is not set".to_string()))?;

        let body = self
            .http
            .get_json(
                SERVICE,
                &endpoint(&self.config.base_url, "data/2.5/weather"),
                &[("id", self.config.city_id.as_str()), ("APPID", api_key)],
            )
            .await?;

        let entry = CachedWeather {
            city_id: self.config.city_id.clone(),
            fetched_at: Utc::now(),
            body: body.clone(),
        };
        self.write_cache_file(&entry);
        *cache = Some(entry);
        Ok(body)
    }
}
