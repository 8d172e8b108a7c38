use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::error::{JournalError, Result};

/// Shared HTTP client for the upstream services.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
}

impl ServiceClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET returning the raw JSON body
    pub async fn get_json<Q: Serialize + ?Sized>(
        &self,
        service: &'static str,
        url: &str,
        query: &Q,
    ) -> Result<Value> {
        self.send(service, self.client.get(url).query(query)).await
    }

    /// POST a JSON body and decode the response
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: RequestBuilder,
        body: &B,
    ) -> Result<T> {
        self.send(service, request.json(body)).await
    }

    /// POST a form body and decode the response
    pub async fn post_form<F: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        form: &F,
    ) -> Result<T> {
        self.send(service, self.client.post(url).form(form)).await
    }

    /// Send the request, mapping non-success statuses to `Upstream`.
    pub async fn send<T: DeserializeOwned>(
        &self,
        service: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        debug!(service, status = status.as_u16(), "upstream response");

        if !status.is_success() {
            warn!(service, status = status.as_u16(), "upstream request failed");
            return Err(JournalError::Upstream {
                service,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Join a base URL and a path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
