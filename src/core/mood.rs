use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{JournalError, Result};

/// Emotion intensities as reported by the analysis service, each in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(BTreeMap<String, f64>);

impl EmotionScores {
    pub fn new(scores: BTreeMap<String, f64>) -> Self {
        Self(scores)
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(label, value)| (label.as_str(), *value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A metric value on the 1-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct MetricValue(u8);

impl MetricValue {
    pub const MIN: MetricValue = MetricValue(1);
    pub const MAX: MetricValue = MetricValue(5);

    /// Rescale an intensity in [0, 1] onto 1-5, rounding half to even.
    pub fn from_intensity(value: f64) -> Self {
        // NaN clamps to NaN and casts to 0
        let steps = (value * 4.0).round_ties_even().clamp(0.0, 4.0) as u8;
        MetricValue(steps + 1)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for MetricValue {
    type Error = JournalError;

    fn try_from(value: i64) -> Result<Self> {
        if (1..=5).contains(&value) {
            Ok(MetricValue(value as u8))
        } else {
            Err(JournalError::InvalidMetricValue(value))
        }
    }
}

impl From<MetricValue> for i64 {
    fn from(value: MetricValue) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower-cased metric name to scaled value.
pub type MoodScores = BTreeMap<String, MetricValue>;

/// Convert raw emotion intensities into 1-5 metric values keyed by lower-cased label.
pub fn score_mood(emotions: &EmotionScores) -> MoodScores {
    emotions
        .iter()
        .map(|(label, value)| (label.to_lowercase(), MetricValue::from_intensity(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(label: &str, value: f64) -> MoodScores {
        score_mood(&EmotionScores::from_iter([(label, value)]))
    }

    #[test]
    fn test_scale_endpoints_and_midpoint() {
        assert_eq!(single("Joy", 0.0)["joy"].get(), 1);
        assert_eq!(single("Joy", 1.0)["joy"].get(), 5);
        assert_eq!(single("Joy", 0.5)["joy"].get(), 3);
    }

    #[test]
    fn test_labels_are_lowercased() {
        let scores = score_mood(&EmotionScores::from_iter([("Sadness", 0.2), ("FEAR", 0.9)]));
        let keys: Vec<&str> = scores.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["fear", "sadness"]);
    }

    #[test]
    fn test_half_rounds_to_even() {
        assert_eq!(MetricValue::from_intensity(0.125).get(), 1);
        assert_eq!(MetricValue::from_intensity(0.375).get(), 3);
        assert_eq!(MetricValue::from_intensity(0.625).get(), 3);
        assert_eq!(MetricValue::from_intensity(0.875).get(), 5);
    }

    #[test]
    fn test_range_and_monotonic() {
        let mut previous = MetricValue::MIN;
        for step in 0..=1000 {
            let value = MetricValue::from_intensity(f64::from(step) / 1000.0);
            assert!(value >= MetricValue::MIN && value <= MetricValue::MAX);
            assert!(value >= previous);
            previous = value;
        }
        assert_eq!(previous, MetricValue::MAX);
    }

    #[test]
    fn test_out_of_contract_input_is_clamped() {
        assert_eq!(MetricValue::from_intensity(-3.0), MetricValue::MIN);
        assert_eq!(MetricValue::from_intensity(7.5), MetricValue::MAX);
        assert_eq!(MetricValue::from_intensity(1e300), MetricValue::MAX);
        assert_eq!(MetricValue::from_intensity(f64::INFINITY), MetricValue::MAX);
        assert_eq!(MetricValue::from_intensity(f64::NEG_INFINITY), MetricValue::MIN);
        assert_eq!(MetricValue::from_intensity(f64::NAN), MetricValue::MIN);
    }

    #[test]
    fn test_empty_input() {
        assert!(score_mood(&EmotionScores::default()).is_empty());
    }

    #[test]
    fn test_metric_value_serde() {
        let value: MetricValue = serde_json::from_str("4").unwrap();
        assert_eq!(value.get(), 4);
        assert_eq!(serde_json::to_string(&value).unwrap(), "4");
        assert!(serde_json::from_str::<MetricValue>("0").is_err());
        assert!(serde_json::from_str::<MetricValue>("6").is_err());
    }
}
