use chrono::NaiveDate;
use rand::Rng;
use scraper::Html;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::Result;
use crate::core::mood::{score_mood, EmotionScores, MetricValue, MoodScores};
use crate::core::page::{GraphPoint, Identity, Metric, Page, DEFAULT_METRICS};
use crate::core::prompt::{ConversationState, Prompt, PromptSelector};
use crate::core::store::JournalStore;
use crate::services::nlu::TextAnalyzer;

/// The day view returned when a client opens the journal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayPage {
    pub name: String,
    pub page: NaiveDate,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageScores {
    pub success: bool,
    pub scores: MoodScores,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    pub data: Vec<GraphPoint>,
}

/// Remove markup from client text and trim it.
pub fn strip_tags(text: &str) -> String {
    if !text.contains('<') {
        return text.trim().to_string();
    }
    let fragment = Html::parse_fragment(text);
    let plain: String = fragment.root_element().text().collect();
    plain.trim().to_string()
}

/// Journal operations on behalf of an explicit caller.
pub struct JournalService {
    store: JournalStore,
    analyzer: Box<dyn TextAnalyzer>,
    selector: PromptSelector,
}

impl JournalService {
    pub fn new(
        store: JournalStore,
        analyzer: impl TextAnalyzer + 'static,
        selector: PromptSelector,
    ) -> Self {
        Self {
            store,
            analyzer: Box::new(analyzer),
            selector,
        }
    }

    pub fn store(&self) -> &JournalStore {
        &self.store
    }

    /// Open the page for `today`, seeding the default metrics at 1.
    pub fn open_today(&mut self, who: &Identity, today: NaiveDate) -> Result<TodayPage> {
        let (page, created) = self.store.get_or_create_page(who, today)?;
        if created {
            info!(user = %who.username, date = %today, "started new page");
        }
        self.store
            .ensure_metrics(who, today, &DEFAULT_METRICS, MetricValue::MIN)?;

        Ok(TodayPage {
            name: self.store.first_name(who),
            page: page.date,
            content: page.content,
        })
    }

    pub fn pages(&self, who: &Identity) -> Vec<Page> {
        self.store.pages(who)
    }

    pub fn page(&self, who: &Identity, date: NaiveDate) -> Result<Page> {
        self.store.page(who, date)
    }

    pub fn entry(&self, who: &Identity, date: NaiveDate) -> Result<String> {
        Ok(self.store.page(who, date)?.content)
    }

    pub fn create_page(&mut self, who: &Identity, date: NaiveDate, content: String) -> Result<Page> {
        self.store.create_page(who, date, content)
    }

    pub fn write_page(&mut self, who: &Identity, date: NaiveDate, content: String) -> Result<Page> {
        self.store.put_page(who, date, content)
    }

    pub fn delete_page(&mut self, who: &Identity, date: NaiveDate) -> Result<()> {
        self.store.delete_page(who, date)
    }

    pub fn metrics(&self, who: &Identity, date: NaiveDate) -> Result<Vec<Metric>> {
        self.store.metrics(who, date)
    }

    pub fn metric(&self, who: &Identity, date: NaiveDate, name: &str) -> Result<Metric> {
        self.store.metric(who, date, name)
    }

    pub fn set_metric(
        &mut self,
        who: &Identity,
        date: NaiveDate,
        name: &str,
        value: MetricValue,
    ) -> Result<Metric> {
        self.store.upsert_metric(who, date, name, value)
    }

    pub fn delete_metric(&mut self, who: &Identity, date: NaiveDate, name: &str) -> Result<()> {
        self.store.delete_metric(who, date, name)
    }

    /// Analyse the page text and overwrite its metrics with the scaled scores.
    pub async fn score_page(&mut self, who: &Identity, date: NaiveDate) -> Result<PageScores> {
        let page = self.store.page(who, date)?;
        let emotions = self.analyzer.emotions(&page.content).await?;
        let scores = score_mood(&emotions);

        self.store.upsert_metrics(
            who,
            date,
            scores.iter().map(|(name, value)| (name.as_str(), *value)),
        )?;
        debug!(user = %who.username, date = %date, metrics = scores.len(), "page scored");

        Ok(PageScores {
            success: true,
            scores,
        })
    }

    /// Raw emotion intensities for free text; `None` when there is no text.
    pub async fn score_text(&self, text: &str) -> Result<Option<EmotionScores>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(self.analyzer.emotions(text).await?))
    }

    /// Next conversational question for the client's text.
    pub async fn prompt<R: Rng + ?Sized>(
        &self,
        text: &str,
        state: &ConversationState,
        rng: &mut R,
    ) -> Result<Prompt> {
        let text = strip_tags(text);
        let analysis = if text.is_empty() {
            None
        } else {
            Some(self.analyzer.analyze(&text).await?)
        };
        self.selector.select(analysis.as_ref(), state, rng)
    }

    pub fn graph(&self, who: &Identity) -> Graph {
        Graph {
            data: self.store.graph(who),
        }
    }
}
