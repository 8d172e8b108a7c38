use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::analysis::{DominantFocus, Focus, FocusResolver, TextAnalysis};
use super::error::{JournalError, Result};

/// Prompt bank shipped with the binary and written on first run.
pub const DEFAULT_PROMPTS: &str = include_str!("../../assets/prompts.json");

const ENTITY_SLOT: &str = "{}";

/// Tone of a conversation turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Parse a label coming from a client or an upstream service, falling back to neutral.
    pub fn parse_lenient(label: &str) -> Self {
        if label.trim().is_empty() {
            return Sentiment::Neutral;
        }
        label.parse().unwrap_or_else(|_| {
            warn!(label, "unrecognised sentiment label, using neutral");
            Sentiment::Neutral
        })
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            _ => Err(JournalError::UnknownSentiment(s.to_string())),
        }
    }
}

/// State the client echoes back on every turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub last_entity: Option<String>,
    pub last_sentiment: Sentiment,
}

impl ConversationState {
    /// Build from raw client values; empty strings count as absent.
    pub fn from_client(last_entity: Option<&str>, last_sentiment: Option<&str>) -> Self {
        Self {
            last_entity: last_entity
                .map(str::trim)
                .filter(|entity| !entity.is_empty())
                .map(str::to_string),
            last_sentiment: last_sentiment.map(Sentiment::parse_lenient).unwrap_or_default(),
        }
    }
}

/// A follow-up question plus the state to echo next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub question: String,
    #[serde(rename = "lastObj")]
    pub entity: String,
    #[serde(rename = "lastSentiment")]
    pub sentiment: Sentiment,
}

impl Prompt {
    pub fn next_state(&self) -> ConversationState {
        ConversationState::from_client(Some(&self.entity), Some(self.sentiment.as_str()))
    }
}

/// Questions for one sentiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSet {
    /// Templates with a single `{}` slot for the entity
    #[serde(rename = "arg", default)]
    pub with_entity: Vec<String>,
    #[serde(rename = "no_arg", default)]
    pub without_entity: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PromptBank {
    entries: HashMap<Sentiment, PromptSet>,
}

impl PromptBank {
    /// Parse a bank document. Keys must be known sentiments; coverage is not checked.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, PromptSet> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|(label, set)| Ok((label.parse::<Sentiment>()?, set)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { entries })
    }

    /// Read and fully validate a bank file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let bank = Self::from_json_str(&json)?;
        bank.validate()?;
        debug!(path = %path.display(), sentiments = bank.entries.len(), "prompt bank loaded");
        Ok(bank)
    }

    pub fn builtin() -> Result<Self> {
        let bank = Self::from_json_str(DEFAULT_PROMPTS)?;
        bank.validate()?;
        Ok(bank)
    }

    /// Every sentiment must have non-empty lists and well-formed templates.
    pub fn validate(&self) -> Result<()> {
        for sentiment in Sentiment::ALL {
            let set = self.get(sentiment)?;
            if set.with_entity.is_empty() {
                return Err(JournalError::EmptyPromptList { sentiment, kind: "arg" });
            }
            if set.without_entity.is_empty() {
                return Err(JournalError::EmptyPromptList { sentiment, kind: "no_arg" });
            }
            if let Some(template) = set
                .with_entity
                .iter()
                .find(|template| template.matches(ENTITY_SLOT).count() != 1)
            {
                return Err(JournalError::InvalidTemplate {
                    sentiment,
                    template: template.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, sentiment: Sentiment) -> Result<&PromptSet> {
        self.entries
            .get(&sentiment)
            .ok_or(JournalError::MissingSentiment(sentiment))
    }

    pub fn insert(&mut self, sentiment: Sentiment, set: PromptSet) {
        self.entries.insert(sentiment, set);
    }
}

/// Chooses follow-up questions from a prompt bank.
pub struct PromptSelector {
    bank: PromptBank,
    resolver: Box<dyn FocusResolver>,
}

impl PromptSelector {
    pub fn new(bank: PromptBank) -> Self {
        Self::with_resolver(bank, DominantFocus)
    }

    pub fn with_resolver(bank: PromptBank, resolver: impl FocusResolver + 'static) -> Self {
        Self {
            bank,
            resolver: Box::new(resolver),
        }
    }

    pub fn bank(&self) -> &PromptBank {
        &self.bank
    }

    /// `analysis` is `None` when the turn carried no text; that always
    /// yields a neutral question without an entity.
    pub fn select<R: Rng + ?Sized>(
        &self,
        analysis: Option<&TextAnalysis>,
        state: &ConversationState,
        rng: &mut R,
    ) -> Result<Prompt> {
        let focus = match analysis {
            Some(analysis) => self.resolver.resolve(analysis, state),
            None => Focus::neutral(),
        };

        let set = self.bank.get(focus.sentiment)?;
        let question = match focus.entity.as_deref() {
            None => set
                .without_entity
                .choose(rng)
                .ok_or(JournalError::EmptyPromptList {
                    sentiment: focus.sentiment,
                    kind: "no_arg",
                })?
                .clone(),
            Some(entity) => set
                .with_entity
                .choose(rng)
                .ok_or(JournalError::EmptyPromptList {
                    sentiment: focus.sentiment,
                    kind: "arg",
                })?
                .replacen(ENTITY_SLOT, entity, 1),
        };

        Ok(Prompt {
            question,
            entity: focus.entity.unwrap_or_default(),
            sentiment: focus.sentiment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::ExtractedEntity;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn set(with_entity: &[&str], without_entity: &[&str]) -> PromptSet {
        PromptSet {
            with_entity: with_entity.iter().map(|s| s.to_string()).collect(),
            without_entity: without_entity.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn single_template_bank() -> PromptBank {
        let mut bank = PromptBank::default();
        bank.insert(Sentiment::Positive, set(&["Why do you love {}?"], &["Nice!"]));
        bank.insert(Sentiment::Negative, set(&["What went wrong with {}?"], &["Oh no."]));
        bank.insert(Sentiment::Neutral, set(&["Tell me about {}."], &["How was today?"]));
        bank
    }

    fn analysis_with(entity: &str, sentiment: Sentiment) -> TextAnalysis {
        TextAnalysis {
            entities: vec![ExtractedEntity::new(entity, 0.9).with_sentiment(sentiment, 0.5)],
            ..TextAnalysis::default()
        }
    }

    #[test]
    fn test_no_text_is_neutral_without_entity() {
        let selector = PromptSelector::new(single_template_bank());
        let mut rng = StdRng::seed_from_u64(7);
        let state = ConversationState {
            last_entity: Some("work".to_string()),
            last_sentiment: Sentiment::Negative,
        };

        let prompt = selector.select(None, &state, &mut rng).unwrap();
        assert_eq!(prompt.sentiment, Sentiment::Neutral);
        assert_eq!(prompt.entity, "");
        assert_eq!(prompt.question, "How was today?");
    }

    #[test]
    fn test_single_template_is_deterministic_and_substituted() {
        let selector = PromptSelector::new(single_template_bank());
        let mut rng = StdRng::seed_from_u64(1);
        let analysis = analysis_with("my sister", Sentiment::Positive);

        for _ in 0..20 {
            let prompt = selector
                .select(Some(&analysis), &ConversationState::default(), &mut rng)
                .unwrap();
            assert_eq!(prompt.question, "Why do you love my sister?");
            assert_eq!(prompt.entity, "my sister");
            assert_eq!(prompt.sentiment, Sentiment::Positive);
        }
    }

    #[test]
    fn test_missing_sentiment_is_config_error() {
        let mut bank = PromptBank::default();
        bank.insert(Sentiment::Neutral, set(&["About {}?"], &["Hi"]));
        let selector = PromptSelector::new(bank);
        let mut rng = StdRng::seed_from_u64(3);

        let err = selector
            .select(
                Some(&analysis_with("rain", Sentiment::Negative)),
                &ConversationState::default(),
                &mut rng,
            )
            .unwrap_err();
        assert!(matches!(err, JournalError::MissingSentiment(Sentiment::Negative)));
        assert!(err.is_prompt_config());
    }

    #[test]
    fn test_empty_list_is_error_not_empty_question() {
        let mut bank = single_template_bank();
        bank.insert(Sentiment::Neutral, set(&["About {}?"], &[]));
        let selector = PromptSelector::new(bank);
        let mut rng = StdRng::seed_from_u64(3);

        let err = selector
            .select(None, &ConversationState::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, JournalError::EmptyPromptList { kind: "no_arg", .. }));
    }

    #[test]
    fn test_no_text_round_trip_resets_to_neutral() {
        let selector = PromptSelector::new(single_template_bank());
        let mut rng = StdRng::seed_from_u64(11);

        let first = selector
            .select(
                Some(&analysis_with("job", Sentiment::Negative)),
                &ConversationState::default(),
                &mut rng,
            )
            .unwrap();
        assert_eq!(first.sentiment, Sentiment::Negative);

        let second = selector.select(None, &first.next_state(), &mut rng).unwrap();
        assert_eq!(second.sentiment, Sentiment::Neutral);
        assert_eq!(second.entity, "");
    }

    #[test]
    fn test_random_choice_stays_within_candidates() {
        let bank = PromptBank::builtin().unwrap();
        let candidates = bank.get(Sentiment::Neutral).unwrap().without_entity.clone();
        let selector = PromptSelector::new(bank);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let prompt = selector
                .select(None, &ConversationState::default(), &mut rng)
                .unwrap();
            assert!(candidates.contains(&prompt.question));
        }
    }

    #[test]
    fn test_builtin_bank_is_valid() {
        let bank = PromptBank::builtin().unwrap();
        for sentiment in Sentiment::ALL {
            assert!(bank.get(sentiment).is_ok());
        }
    }

    #[test]
    fn test_parse_rejects_unknown_sentiment_key() {
        let err = PromptBank::from_json_str(r#"{"ecstatic": {"arg": ["{}"], "no_arg": ["hi"]}}"#)
            .unwrap_err();
        assert!(matches!(err, JournalError::UnknownSentiment(label) if label == "ecstatic"));
    }

    #[test]
    fn test_validate_reports_missing_coverage() {
        let bank =
            PromptBank::from_json_str(r#"{"neutral": {"arg": ["{}?"], "no_arg": ["hi"]}}"#).unwrap();
        assert!(matches!(
            bank.validate(),
            Err(JournalError::MissingSentiment(Sentiment::Positive))
        ));
    }

    #[test]
    fn test_validate_rejects_template_without_slot() {
        let mut bank = single_template_bank();
        bank.insert(Sentiment::Negative, set(&["What went wrong?"], &["Oh no."]));
        assert!(matches!(
            bank.validate(),
            Err(JournalError::InvalidTemplate { sentiment: Sentiment::Negative, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, DEFAULT_PROMPTS).unwrap();
        assert!(PromptBank::load(&path).is_ok());

        std::fs::write(&path, r#"{"neutral": {"arg": [], "no_arg": []}}"#).unwrap();
        assert!(PromptBank::load(&path).unwrap_err().is_prompt_config());
    }

    #[test]
    fn test_client_state_parsing() {
        let state = ConversationState::from_client(Some("  "), Some("POSITIVE"));
        assert_eq!(state.last_entity, None);
        assert_eq!(state.last_sentiment, Sentiment::Positive);

        let state = ConversationState::from_client(Some("tea"), Some("meh"));
        assert_eq!(state.last_entity.as_deref(), Some("tea"));
        assert_eq!(state.last_sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_prompt_json_shape() {
        let prompt = Prompt {
            question: "How was your day?".to_string(),
            entity: String::new(),
            sentiment: Sentiment::Neutral,
        };
        let value = serde_json::to_value(&prompt).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"question": "How was your day?", "lastObj": "", "lastSentiment": "neutral"})
        );
    }
}
