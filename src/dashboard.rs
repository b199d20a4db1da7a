//! Dashboard Content
//!
//! Personal advice and the daily article, backed by the local cache so the
//! dashboard still has something to show when the backend is unreachable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, RecoveredError};
use crate::cache::{LocalCache, ADVICE_KEY, DAILY_ARTICLE_KEY};
use crate::model::{Advice, Article};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedArticle {
    date: NaiveDate,
    article: Article,
}

pub struct Dashboard {
    api: ApiClient,
    cache: LocalCache,
    last_error: Option<RecoveredError>,
}

impl Dashboard {
    pub fn new(api: ApiClient, cache: LocalCache) -> Self {
        Self {
            api,
            cache,
            last_error: None,
        }
    }

    pub fn last_error(&self) -> Option<&RecoveredError> {
        self.last_error.as_ref()
    }

    fn remember<T: Serialize>(&mut self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value) {
            tracing::warn!(key, error = %e, "Failed to cache dashboard content");
        }
    }

    /// Fresh advice, or the last cached advice when the fetch fails
    pub async fn advice(&mut self, user_id: &str) -> Option<Advice> {
        match self.api.advice(user_id).await {
            Ok(advice) => {
                self.remember(ADVICE_KEY, &advice);
                Some(advice)
            }
            Err(e) => {
                self.last_error = Some(RecoveredError::record("load advice", &e));
                self.cache.get(ADVICE_KEY)
            }
        }
    }

    /// The article for `today`. Fetched at most once per day; falls back to
    /// whatever was cached last.
    pub async fn daily_article(&mut self, today: NaiveDate) -> Option<Article> {
        let cached: Option<CachedArticle> = self.cache.get(DAILY_ARTICLE_KEY);
        if let Some(hit) = cached.as_ref().filter(|c| c.date == today) {
            return Some(hit.article.clone());
        }

        match self.api.daily_article().await {
            Ok(article) => {
                self.remember(
                    DAILY_ARTICLE_KEY,
                    &CachedArticle {
                        date: today,
                        article: article.clone(),
                    },
                );
                Some(article)
            }
            Err(e) => {
                self.last_error = Some(RecoveredError::record("load daily article", &e));
                cached.map(|c| c.article)
            }
        }
    }
}
