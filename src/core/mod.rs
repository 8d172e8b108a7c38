pub mod analysis;
pub mod error;
pub mod mood;
pub mod page;
pub mod prompt;
pub mod store;

pub use analysis::{DominantFocus, ExtractedEntity, Focus, FocusResolver, TextAnalysis};
pub use error::{JournalError, Result};
pub use mood::{score_mood, EmotionScores, MetricValue, MoodScores};
pub use page::{GraphPoint, Identity, Metric, Page, DEFAULT_METRICS};
pub use prompt::{ConversationState, Prompt, PromptBank, PromptSelector, PromptSet, Sentiment};
pub use store::JournalStore;
