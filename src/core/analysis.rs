use serde::{Deserialize, Serialize};

use super::mood::EmotionScores;
use super::prompt::{ConversationState, Sentiment};

/// Emotions that pull the document tone negative.
const NEGATIVE_EMOTIONS: [&str; 4] = ["sadness", "fear", "disgust", "anger"];

/// Minimum joy/negative gap before the document tone leaves neutral.
const TONE_MARGIN: f64 = 0.1;

/// Sentiment attached to a single extracted entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySentiment {
    pub label: Sentiment,
    #[serde(default)]
    pub score: f64,
}

/// A salient topic found in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub text: String,
    /// Salience reported by the analysis service (0.0-1.0)
    #[serde(default)]
    pub relevance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<EntitySentiment>,
}

impl ExtractedEntity {
    pub fn new(text: impl Into<String>, relevance: f64) -> Self {
        Self {
            text: text.into(),
            relevance,
            sentiment: None,
        }
    }

    pub fn with_sentiment(mut self, label: Sentiment, score: f64) -> Self {
        self.sentiment = Some(EntitySentiment { label, score });
        self
    }
}

/// Entities and document-level emotion for one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub entities: Vec<ExtractedEntity>,
    pub emotion: EmotionScores,
}

/// The topic and tone a follow-up question should address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub entity: Option<String>,
    pub sentiment: Sentiment,
}

impl Focus {
    pub fn neutral() -> Self {
        Self {
            entity: None,
            sentiment: Sentiment::Neutral,
        }
    }
}

/// Reduces an analysis plus the previous turn into a single focus.
pub trait FocusResolver: Send + Sync {
    fn resolve(&self, analysis: &TextAnalysis, state: &ConversationState) -> Focus;
}

/// Picks the most relevant entity and its tone, carrying the previous
/// topic forward when the new text names none.
#[derive(Debug, Clone, Default)]
pub struct DominantFocus;

impl DominantFocus {
    /// Document tone from emotion intensities.
    pub fn tone(emotion: &EmotionScores) -> Sentiment {
        let joy = emotion.get("joy").unwrap_or(0.0);
        let negative = NEGATIVE_EMOTIONS
            .iter()
            .filter_map(|label| emotion.get(label))
            .fold(0.0_f64, f64::max);

        let gap = joy - negative;
        if gap > TONE_MARGIN {
            Sentiment::Positive
        } else if gap < -TONE_MARGIN {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl FocusResolver for DominantFocus {
    fn resolve(&self, analysis: &TextAnalysis, state: &ConversationState) -> Focus {
        let dominant = analysis
            .entities
            .iter()
            .filter(|entity| !entity.text.trim().is_empty())
            .fold(None::<&ExtractedEntity>, |best, entity| match best {
                Some(current) if current.relevance >= entity.relevance => Some(current),
                _ => Some(entity),
            });

        match dominant {
            Some(entity) => Focus {
                entity: Some(entity.text.trim().to_string()),
                sentiment: entity
                    .sentiment
                    .as_ref()
                    .map(|s| s.label)
                    .unwrap_or_else(|| Self::tone(&analysis.emotion)),
            },
            None => {
                let sentiment = match Self::tone(&analysis.emotion) {
                    Sentiment::Neutral => state.last_sentiment,
                    tone => tone,
                };
                Focus {
                    entity: state.last_entity.clone(),
                    sentiment,
                }
            }
        }
    }
}
