use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::page::Identity;
use crate::core::prompt::DEFAULT_PROMPTS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub user: UserConfig,
    /// Prompt bank location; defaults to `prompts.json` in the data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub first_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub nlu: NluConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub places: PlacesConfig,
    #[serde(default)]
    pub wiki: WikiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NluConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub version: String,
    pub language: String,
    pub entity_limit: u32,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            url: "https://api.us-south.natural-language-understanding.watson.cloud.ibm.com".to_string(),
            api_key: None,
            version: "2022-04-07".to_string(),
            language: "en".to_string(),
            entity_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub base_url: String,
    pub city_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub cache_ttl_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.openweathermap.org".to_string(),
            city_id: "4931972".to_string(),
            api_key: None,
            cache_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://test.api.amadeus.com".to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    pub base_url: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org".to_string(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// The configured secret, or the environment variable when unset.
fn env_fallback(value: &Option<String>, var: &str) -> Option<String> {
    value
        .clone()
        .filter(|value| !value.is_empty())
        .or_else(|| std::env::var(var).ok())
}

impl Config {
    pub fn default_data_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("daybook")
    }

    /// Load `config.json` from the data directory, writing defaults (and the
    /// default prompt bank) on first run.
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(Self::default_data_dir);

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");
        let mut config = if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;
            if config_str.trim().is_empty() {
                warn!(path = %config_path.display(), "config file is empty, recreating");
                Self::write_default(&data_dir)?
            } else {
                serde_json::from_str::<Config>(&config_str)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?
            }
        } else {
            Self::write_default(&data_dir)?
        };
        config.data_dir = data_dir;

        let prompts = config.prompts_file();
        if !prompts.exists() {
            std::fs::write(&prompts, DEFAULT_PROMPTS)
                .with_context(|| format!("Failed to write {}", prompts.display()))?;
            info!(path = %prompts.display(), "wrote default prompt bank");
        }

        Ok(config)
    }

    fn write_default(data_dir: &std::path::Path) -> Result<Self> {
        let config = Self::default_config(data_dir.to_path_buf());
        let json_str =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config")?;
        std::fs::write(data_dir.join("config.json"), json_str)
            .context("Failed to write default config.json")?;
        info!(path = %data_dir.display(), "created default configuration");
        Ok(config)
    }

    fn default_config(data_dir: PathBuf) -> Self {
        let username = std::env::var("USER").unwrap_or_else(|_| "journal".to_string());
        Config {
            data_dir,
            user: UserConfig {
                first_name: username.clone(),
                username,
            },
            prompts_file: None,
            http_timeout_secs: default_timeout_secs(),
            services: ServicesConfig::default(),
        }
    }

    /// Service settings with unset secrets taken from `DAYBOOK_*` variables.
    /// Only the file values are ever saved.
    pub fn resolved_services(&self) -> ServicesConfig {
        let mut services = self.services.clone();
        services.nlu.api_key = env_fallback(&services.nlu.api_key, "DAYBOOK_NLU_API_KEY");
        services.weather.api_key =
            env_fallback(&services.weather.api_key, "DAYBOOK_WEATHER_API_KEY");
        services.places.client_id =
            env_fallback(&services.places.client_id, "DAYBOOK_AMADEUS_CLIENT_ID");
        services.places.client_secret =
            env_fallback(&services.places.client_secret, "DAYBOOK_AMADEUS_CLIENT_SECRET");
        services
    }

    pub fn save(&self) -> Result<()> {
        let json_str = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(self.data_dir.join("config.json"), json_str)
            .context("Failed to write config.json")?;
        Ok(())
    }

    /// Identity for CLI calls, overridden by `--user`.
    pub fn identity(&self, username: Option<String>) -> Identity {
        match username {
            Some(name) if name != self.user.username => Identity::new(name.clone(), name),
            _ => Identity::new(self.user.username.clone(), self.user.first_name.clone()),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn journal_file(&self) -> PathBuf {
        self.data_dir.join("journal.json")
    }

    pub fn weather_cache_file(&self) -> PathBuf {
        self.data_dir.join("weather_cache.json")
    }

    pub fn prompts_file(&self) -> PathBuf {
        match &self.prompts_file {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.data_dir.join(path),
            None => self.data_dir.join("prompts.json"),
        }
    }
}
