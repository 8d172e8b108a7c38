use serde::{Deserialize, Serialize};

use crate::config::WikiConfig;
use crate::core::error::{JournalError, Result};
use crate::http_client::{endpoint, ServiceClient};

const SERVICE: &str = "wikipedia";

/// Rendered article returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiArticle {
    pub title: String,
    /// Article body as HTML
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: Option<ParsedPage>,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    title: String,
    text: ParsedText,
}

#[derive(Debug, Deserialize)]
struct ParsedText {
    #[serde(rename = "*")]
    html: String,
}

pub struct WikiClient {
    http: ServiceClient,
    config: WikiConfig,
}

impl WikiClient {
    pub fn new(http: ServiceClient, config: WikiConfig) -> Self {
        Self { http, config }
    }

    pub async fn article(&self, query: &str) -> Result<WikiArticle> {
        let request = self
            .http
            .inner()
            .get(endpoint(&self.config.base_url, "w/api.php"))
            .query(&[("action", "parse"), ("format", "json"), ("page", query)]);

        let response: ParseResponse = self.http.send(SERVICE, request).await?;
        let page = response.parse.ok_or_else(|| JournalError::MalformedResponse {
            service: SERVICE,
            detail: format!("no page parsed for '{}'", query),
        })?;

        Ok(WikiArticle {
            title: page.title,
            content: page.text.html,
        })
    }
}
