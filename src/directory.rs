//! Therapist Directory
//!
//! Browsing, server-ranked matches and locally persisted favorites.

use crate::api::{ApiClient, RecoveredError};
use crate::cache::{CacheError, LocalCache, FAVORITES_KEY};
use crate::model::{TherapistMatch, TherapistProfile};

pub struct Directory {
    api: ApiClient,
    cache: LocalCache,
    therapists: Vec<TherapistProfile>,
    matches: Vec<TherapistMatch>,
    favorites: Vec<String>,
    last_error: Option<RecoveredError>,
}

impl Directory {
    pub fn new(api: ApiClient, cache: LocalCache) -> Self {
        let favorites = cache.get(FAVORITES_KEY).unwrap_or_default();
        Self {
            api,
            cache,
            therapists: Vec::new(),
            matches: Vec::new(),
            favorites,
            last_error: None,
        }
    }

    /// Reload the full therapist list. On failure the old list stays.
    pub async fn refresh_therapists(&mut self) -> &[TherapistProfile] {
        match self.api.therapists().await {
            Ok(therapists) => {
                self.therapists = therapists;
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(RecoveredError::record("list therapists", &e)),
        }
        &self.therapists
    }

    /// Reload matches for `user_id`, keeping the backend's ranking
    pub async fn refresh_matches(&mut self, user_id: &str) -> &[TherapistMatch] {
        match self.api.matches(user_id).await {
            Ok(matches) => {
                self.matches = matches;
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(RecoveredError::record("load matches", &e)),
        }
        &self.matches
    }

    pub fn therapists(&self) -> &[TherapistProfile] {
        &self.therapists
    }

    pub fn matches(&self) -> &[TherapistMatch] {
        &self.matches
    }

    pub fn last_error(&self) -> Option<&RecoveredError> {
        self.last_error.as_ref()
    }

    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    pub fn is_favorite(&self, therapist_id: &str) -> bool {
        self.favorites.iter().any(|id| id == therapist_id)
    }

    /// Flip a favorite and persist. Returns the new state.
    pub fn toggle_favorite(&mut self, therapist_id: &str) -> Result<bool, CacheError> {
        let now_favorite = if self.is_favorite(therapist_id) {
            self.favorites.retain(|id| id != therapist_id);
            false
        } else {
            self.favorites.push(therapist_id.to_string());
            true
        };
        self.cache.set(FAVORITES_KEY, &self.favorites)?;
        Ok(now_favorite)
    }

    /// Loaded therapists that are favorited, in list order
    pub fn favorite_therapists(&self) -> Vec<&TherapistProfile> {
        self.therapists
            .iter()
            .filter(|t| self.is_favorite(&t.id))
            .collect()
    }
}

/// Match percentage as displayed, e.g. "87%"
pub fn format_match(percentage: f64) -> String {
    format!("{:.0}%", percentage.clamp(0.0, 100.0))
}
