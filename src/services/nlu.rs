use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::NluConfig;
use crate::core::analysis::{EntitySentiment, ExtractedEntity, TextAnalysis};
use crate::core::error::{JournalError, Result};
use crate::core::mood::EmotionScores;
use crate::core::prompt::Sentiment;
use crate::http_client::{endpoint, ServiceClient};

const SERVICE: &str = "nlu";

/// External emotion and entity extraction.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Document-level emotion intensities.
    async fn emotions(&self, text: &str) -> Result<EmotionScores>;

    /// Salient entities with their sentiment, plus document emotion.
    async fn analyze(&self, text: &str) -> Result<TextAnalysis>;
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    emotion: Option<EmotionSection>,
    #[serde(default)]
    entities: Vec<RawEntity>,
}

#[derive(Debug, Deserialize)]
struct EmotionSection {
    document: DocumentEmotion,
}

#[derive(Debug, Deserialize)]
struct DocumentEmotion {
    emotion: EmotionScores,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    text: String,
    #[serde(default)]
    relevance: f64,
    #[serde(default)]
    sentiment: Option<RawSentiment>,
}

#[derive(Debug, Deserialize)]
struct RawSentiment {
    label: String,
    #[serde(default)]
    score: f64,
}

impl From<RawEntity> for ExtractedEntity {
    fn from(raw: RawEntity) -> Self {
        ExtractedEntity {
            text: raw.text,
            relevance: raw.relevance,
            sentiment: raw.sentiment.map(|s| EntitySentiment {
                label: Sentiment::parse_lenient(&s.label),
                score: s.score,
            }),
        }
    }
}

/// IBM Watson Natural Language Understanding client.
pub struct NluClient {
    http: ServiceClient,
    config: NluConfig,
}

impl NluClient {
    pub fn new(http: ServiceClient, config: NluConfig) -> Self {
        Self { http, config }
    }

    async fn call(&self, text: &str, features: serde_json::Value) -> Result<AnalyzeResponse> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| JournalError::Config("NLU api_key is not set".to_string()))?;

        let request = self
            .http
            .inner()
            .post(endpoint(&self.config.url, "v1/analyze"))
            .query(&[("version", self.config.version.as_str())])
            .basic_auth("apikey", Some(api_key));

        let body = json!({
            "text": text,
            "language": self.config.language,
            "features": features,
        });

        debug!(chars = text.len(), "sending text for analysis");
        self.http.post_json(SERVICE, request, &body).await
    }
}

#[async_trait]
impl TextAnalyzer for NluClient {
    async fn emotions(&self, text: &str) -> Result<EmotionScores> {
        let response = self.call(text, json!({ "emotion": {} })).await?;
        response
            .emotion
            .map(|section| section.document.emotion)
            .ok_or_else(|| JournalError::MalformedResponse {
                service: SERVICE,
                detail: "missing emotion.document".to_string(),
            })
    }

    async fn analyze(&self, text: &str) -> Result<TextAnalysis> {
        let features = json!({
            "emotion": {},
            "entities": {
                "emotion": true,
                "sentiment": true,
                "limit": self.config.entity_limit,
            },
        });
        let response = self.call(text, features).await?;

        Ok(TextAnalysis {
            entities: response.entities.into_iter().map(ExtractedEntity::from).collect(),
            emotion: response
                .emotion
                .map(|section| section.document.emotion)
                .unwrap_or_default(),
        })
    }
}
