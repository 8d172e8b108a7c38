use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{JournalError, Result};
use super::mood::MetricValue;
use super::page::{metric_key, GraphPoint, Identity, Metric, Page};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserRecord {
    first_name: String,
    #[serde(default)]
    pages: BTreeMap<NaiveDate, Page>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct JournalData {
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

/// JSON-file journal storage. Every mutation is written through to disk.
pub struct JournalStore {
    data: JournalData,
    path: Option<PathBuf>,
}

impl JournalStore {
    /// Open (or start) the journal file at `path`
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            if json.trim().is_empty() {
                JournalData::default()
            } else {
                serde_json::from_str(&json)?
            }
        } else {
            JournalData::default()
        };

        debug!(path = %path.display(), users = data.users.len(), "journal opened");
        Ok(Self {
            data,
            path: Some(path),
        })
    }

    /// A store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            data: JournalData::default(),
            path: None,
        }
    }

    /// Write to a sibling temp file, then rename it over the journal.
    fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let json = serde_json::to_string_pretty(&self.data)?;
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, json)?;
            std::fs::rename(&tmp, path)?;
        }
        Ok(())
    }

    fn user(&self, who: &Identity) -> Option<&UserRecord> {
        self.data.users.get(&who.username)
    }

    fn user_mut(&mut self, who: &Identity) -> &mut UserRecord {
        self.data
            .users
            .entry(who.username.clone())
            .or_insert_with(|| UserRecord {
                first_name: who.first_name.clone(),
                pages: BTreeMap::new(),
            })
    }

    fn page_mut(&mut self, who: &Identity, date: NaiveDate) -> Result<&mut Page> {
        self.data
            .users
            .get_mut(&who.username)
            .and_then(|user| user.pages.get_mut(&date))
            .ok_or_else(|| JournalError::PageNotFound {
                owner: who.username.clone(),
                date,
            })
    }

    /// Stored display name, falling back to the caller's.
    pub fn first_name(&self, who: &Identity) -> String {
        self.user(who)
            .map(|user| user.first_name.clone())
            .unwrap_or_else(|| who.first_name.clone())
    }

    /// All pages of the caller, oldest first.
    pub fn pages(&self, who: &Identity) -> Vec<Page> {
        self.user(who)
            .map(|user| user.pages.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn page(&self, who: &Identity, date: NaiveDate) -> Result<Page> {
        self.user(who)
            .and_then(|user| user.pages.get(&date))
            .cloned()
            .ok_or_else(|| JournalError::PageNotFound {
                owner: who.username.clone(),
                date,
            })
    }

    pub fn create_page(&mut self, who: &Identity, date: NaiveDate, content: String) -> Result<Page> {
        let user = self.user_mut(who);
        if user.pages.contains_key(&date) {
            return Err(JournalError::PageExists {
                owner: who.username.clone(),
                date,
            });
        }
        let page = Page::new(date, content);
        user.pages.insert(date, page.clone());
        self.save()?;
        Ok(page)
    }

    /// Create the page or replace its content.
    pub fn put_page(&mut self, who: &Identity, date: NaiveDate, content: String) -> Result<Page> {
        let page = match self.user_mut(who).pages.entry(date) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().update_content(content);
                entry.get().clone()
            }
            Entry::Vacant(entry) => entry.insert(Page::new(date, content)).clone(),
        };
        self.save()?;
        Ok(page)
    }

    /// Returns the page and whether it was created by this call.
    pub fn get_or_create_page(&mut self, who: &Identity, date: NaiveDate) -> Result<(Page, bool)> {
        let mut created = false;
        let page = self
            .user_mut(who)
            .pages
            .entry(date)
            .or_insert_with(|| {
                created = true;
                Page::new(date, String::new())
            })
            .clone();
        if created {
            self.save()?;
        }
        Ok((page, created))
    }

    pub fn delete_page(&mut self, who: &Identity, date: NaiveDate) -> Result<()> {
        let removed = self
            .data
            .users
            .get_mut(&who.username)
            .and_then(|user| user.pages.remove(&date));
        if removed.is_none() {
            return Err(JournalError::PageNotFound {
                owner: who.username.clone(),
                date,
            });
        }
        self.save()
    }

    pub fn metrics(&self, who: &Identity, date: NaiveDate) -> Result<Vec<Metric>> {
        Ok(self.page(who, date)?.metrics.into_values().collect())
    }

    pub fn metric(&self, who: &Identity, date: NaiveDate, name: &str) -> Result<Metric> {
        let name = metric_key(name)?;
        self.page(who, date)?
            .metrics
            .remove(&name)
            .ok_or(JournalError::MetricNotFound { date, name })
    }

    /// Create or overwrite the metric; the page must exist.
    pub fn upsert_metric(
        &mut self,
        who: &Identity,
        date: NaiveDate,
        name: &str,
        value: MetricValue,
    ) -> Result<Metric> {
        let name = metric_key(name)?;
        let metric = self.page_mut(who, date)?.upsert_metric(&name, value).clone();
        self.save()?;
        Ok(metric)
    }

    /// Upsert a batch of metrics with a single write.
    pub fn upsert_metrics<'a, I>(&mut self, who: &Identity, date: NaiveDate, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, MetricValue)>,
    {
        let values = values
            .into_iter()
            .map(|(name, value)| Ok((metric_key(name)?, value)))
            .collect::<Result<Vec<_>>>()?;
        let page = self.page_mut(who, date)?;
        for (name, value) in &values {
            page.upsert_metric(name, *value);
        }
        self.save()
    }

    /// Create the metric with `default` unless it already exists.
    pub fn ensure_metrics(
        &mut self,
        who: &Identity,
        date: NaiveDate,
        names: &[&str],
        default: MetricValue,
    ) -> Result<()> {
        let page = self.page_mut(who, date)?;
        let before = page.metrics.len();
        for name in names {
            page.ensure_metric(name, default);
        }
        if page.metrics.len() != before {
            self.save()?;
        }
        Ok(())
    }

    pub fn delete_metric(&mut self, who: &Identity, date: NaiveDate, name: &str) -> Result<()> {
        let name = metric_key(name)?;
        if self.page_mut(who, date)?.metrics.remove(&name).is_none() {
            return Err(JournalError::MetricNotFound { date, name });
        }
        self.save()
    }

    /// Metric history of the caller ordered by date.
    pub fn graph(&self, who: &Identity) -> Vec<GraphPoint> {
        self.user(who)
            .map(|user| user.pages.values().map(GraphPoint::from).collect())
            .unwrap_or_default()
    }
}
