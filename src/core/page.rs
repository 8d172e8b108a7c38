use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{JournalError, Result};
use super::mood::MetricValue;

/// Metrics every page starts with when the day is opened.
pub const DEFAULT_METRICS: [&str; 3] = ["mood", "anxiety", "cynicism"];

/// Who is calling. Passed explicitly into every journal operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub first_name: String,
}

impl Identity {
    pub fn new(username: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            first_name: first_name.into(),
        }
    }
}

/// A named 1-5 indicator attached to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
    pub updated_at: DateTime<Utc>,
}

impl Metric {
    pub fn new(name: &str, value: MetricValue) -> Self {
        Self {
            name: normalize_metric_name(name),
            value,
            updated_at: Utc::now(),
        }
    }
}

/// One journal page per owner per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Keyed by lower-cased metric name
    #[serde(default)]
    pub metrics: BTreeMap<String, Metric>,
}

impl Page {
    pub fn new(date: NaiveDate, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            date,
            content,
            created_at: now,
            updated_at: now,
            metrics: BTreeMap::new(),
        }
    }

    pub fn update_content(&mut self, content: String) {
        self.content = content;
        self.updated_at = Utc::now();
    }

    /// Insert or overwrite a metric; returns the stored value.
    pub fn upsert_metric(&mut self, name: &str, value: MetricValue) -> &Metric {
        let metric = Metric::new(name, value);
        let key = metric.name.clone();
        self.updated_at = metric.updated_at;
        self.metrics.insert(key.clone(), metric);
        &self.metrics[&key]
    }

    /// Insert only when absent; existing values are left alone.
    pub fn ensure_metric(&mut self, name: &str, default: MetricValue) -> &Metric {
        self.metrics
            .entry(normalize_metric_name(name))
            .or_insert_with(|| Metric::new(name, default))
    }

    pub fn metric_values(&self) -> BTreeMap<String, MetricValue> {
        self.metrics
            .iter()
            .map(|(name, metric)| (name.clone(), metric.value))
            .collect()
    }
}

/// One row of the mood graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPoint {
    pub date: NaiveDate,
    pub metrics: BTreeMap<String, MetricValue>,
}

impl From<&Page> for GraphPoint {
    fn from(page: &Page) -> Self {
        Self {
            date: page.date,
            metrics: page.metric_values(),
        }
    }
}

pub fn normalize_metric_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalized metric key; blank names are rejected.
pub fn metric_key(name: &str) -> Result<String> {
    let key = normalize_metric_name(name);
    if key.is_empty() {
        return Err(JournalError::InvalidMetricName(name.to_string()));
    }
    Ok(key)
}
