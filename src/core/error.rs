use chrono::NaiveDate;
use thiserror::Error;

use super::prompt::Sentiment;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} responded with status {status}")]
    Upstream { service: &'static str, status: u16 },

    #[error("Unexpected {service} response: {detail}")]
    MalformedResponse { service: &'static str, detail: String },

    #[error("Page not found: {owner} on {date}")]
    PageNotFound { owner: String, date: NaiveDate },

    #[error("Page already exists: {owner} on {date}")]
    PageExists { owner: String, date: NaiveDate },

    #[error("Metric not found: {name} on {date}")]
    MetricNotFound { date: NaiveDate, name: String },

    #[error("Metric name must not be blank: {0:?}")]
    InvalidMetricName(String),

    #[error("Metric value out of range (1-5): {0}")]
    InvalidMetricValue(i64),

    #[error("Prompt bank has no entry for sentiment '{0}'")]
    MissingSentiment(Sentiment),

    #[error("Unknown sentiment label: {0}")]
    UnknownSentiment(String),

    #[error("Prompt bank '{sentiment}' has an empty {kind} list")]
    EmptyPromptList { sentiment: Sentiment, kind: &'static str },

    #[error("Prompt template for '{sentiment}' must contain exactly one {{}} slot: {template}")]
    InvalidTemplate { sentiment: Sentiment, template: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl JournalError {
    /// True for errors caused by a broken prompt bank rather than by input.
    pub fn is_prompt_config(&self) -> bool {
        matches!(
            self,
            JournalError::MissingSentiment(_)
                | JournalError::UnknownSentiment(_)
                | JournalError::EmptyPromptList { .. }
                | JournalError::InvalidTemplate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
