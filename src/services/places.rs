use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::PlacesConfig;
use crate::core::error::{JournalError, Result};
use crate::http_client::{endpoint, ServiceClient};

const SERVICE: &str = "places";

/// Refresh this long before the token actually expires.
const EXPIRY_SLACK: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Points of interest around a coordinate, via the Amadeus API.
pub struct PlacesClient {
    http: ServiceClient,
    config: PlacesConfig,
    token: Mutex<Option<AccessToken>>,
}

impl PlacesClient {
    pub fn new(http: ServiceClient, config: PlacesConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = &*token {
            if Instant::now() < current.expires_at {
                return Ok(current.value.clone());
            }
        }

        let (client_id, client_secret) = match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => {
                return Err(JournalError::Config(
                    "places client_id/client_secret are not set".to_string(),
                ))
            }
        };

        let response: TokenResponse = self
            .http
            .post_form(
                SERVICE,
                &endpoint(&self.config.base_url, "v1/security/oauth2/token"),
                &[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                ],
            )
            .await?;

        debug!(expires_in = response.expires_in, "places token refreshed");
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_SLACK);
        *token = Some(AccessToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(response.access_token)
    }

    /// Upstream JSON listing points of interest near the coordinate.
    pub async fn points_of_interest(&self, latitude: f64, longitude: f64) -> Result<Value> {
        let token = self.access_token().await?;
        let request = self
            .http
            .inner()
            .get(endpoint(&self.config.base_url, "v1/reference-data/locations/pois"))
            .query(&[("latitude", latitude), ("longitude", longitude)])
            .bearer_auth(token);

        self.http.send(SERVICE, request).await
    }
}
