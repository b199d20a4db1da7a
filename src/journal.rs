//! Journal
//!
//! A signed-in user's journal entries. Reads recover silently; writes are
//! validated first and failures are surfaced as toasts.

use thiserror::Error;

use crate::api::{ApiClient, ApiError, RecoveredError};
use crate::model::{JournalDraft, JournalEntry};
use crate::notify::Notifications;
use crate::validation::{validate_journal, ValidationError};

#[derive(Error, Debug)]
pub enum JournalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct Journal {
    api: ApiClient,
    user_id: String,
    entries: Vec<JournalEntry>,
    last_error: Option<RecoveredError>,
}

impl Journal {
    pub fn new(api: ApiClient, user_id: impl Into<String>) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            entries: Vec::new(),
            last_error: None,
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn last_error(&self) -> Option<&RecoveredError> {
        self.last_error.as_ref()
    }

    pub async fn refresh(&mut self) -> &[JournalEntry] {
        match self.api.journal_entries(&self.user_id).await {
            Ok(entries) => {
                self.entries = entries;
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(RecoveredError::record("load journal", &e)),
        }
        &self.entries
    }

    fn draft(&self, title: &str, content: &str) -> Result<JournalDraft, ValidationError> {
        let draft = JournalDraft {
            user: self.user_id.clone(),
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        };
        validate_journal(&draft)?;
        Ok(draft)
    }

    pub async fn create(
        &mut self,
        title: &str,
        content: &str,
        toasts: &mut Notifications,
    ) -> Result<JournalEntry, JournalError> {
        let draft = self.draft(title, content)?;
        match self.api.create_journal_entry(&draft).await {
            Ok(entry) => {
                self.entries.insert(0, entry.clone());
                toasts.success("Journal entry saved");
                Ok(entry)
            }
            Err(e) => {
                toasts.api_error("create journal entry", &e);
                Err(e.into())
            }
        }
    }

    pub async fn update(
        &mut self,
        id: &str,
        title: &str,
        content: &str,
        toasts: &mut Notifications,
    ) -> Result<JournalEntry, JournalError> {
        let draft = self.draft(title, content)?;
        match self.api.update_journal_entry(id, &draft).await {
            Ok(entry) => {
                if let Some(slot) = self.entries.iter_mut().find(|e| e.id == entry.id) {
                    *slot = entry.clone();
                }
                toasts.success("Journal entry updated");
                Ok(entry)
            }
            Err(e) => {
                toasts.api_error("update journal entry", &e);
                Err(e.into())
            }
        }
    }

    pub async fn delete(&mut self, id: &str, toasts: &mut Notifications) -> Result<(), JournalError> {
        match self.api.delete_journal_entry(id).await {
            Ok(()) => {
                self.entries.retain(|e| e.id != id);
                toasts.success("Journal entry deleted");
                Ok(())
            }
            Err(e) => {
                toasts.api_error("delete journal entry", &e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Method, MockTransport};
    use crate::notify::ToastVariant;
    use serde_json::json;
    use std::sync::Arc;

    fn backend() -> Arc<MockTransport> {
        Arc::new(MockTransport::new(|request| match (request.method, request.path.as_str()) {
            (Method::Get, "journals/user/u1") => Ok(json!([
                {"_id": "j1", "user": "u1", "title": "Monday", "content": "Long day"}
            ])),
            (Method::Post, "journals") => {
                let body = request.body.clone().unwrap_or_default();
                Ok(json!({"_id": "j2", "user": "u1", "title": body["title"], "content": body["content"]}))
            }
            (Method::Put, "journals/j1") => Err(ApiError::Status {
                status: 413,
                message: String::new(),
            }),
            (Method::Delete, "journals/j1") => Ok(serde_json::Value::Null),
            (method, path) => panic!("unexpected {} {}", method, path),
        }))
    }

    #[tokio::test]
    async fn test_create_prepends_and_toasts() {
        let mock = backend();
        let mut journal = Journal::new(ApiClient::with_transport(mock.clone()), "u1");
        let mut toasts = Notifications::default();

        journal.refresh().await;
        let entry = journal
            .create("  Tuesday ", "Better", &mut toasts)
            .await
            .unwrap();

        assert_eq!(entry.title, "Tuesday");
        assert_eq!(journal.entries()[0].id, "j2");
        assert_eq!(journal.entries().len(), 2);
        assert_eq!(toasts.visible().next().unwrap().variant, ToastVariant::Success);
    }

    #[tokio::test]
    async fn test_invalid_draft_never_hits_backend() {
        let mock = backend();
        let mut journal = Journal::new(ApiClient::with_transport(mock.clone()), "u1");
        let mut toasts = Notifications::default();

        let err = journal.create("", "   ", &mut toasts).await.unwrap_err();
        assert!(matches!(err, JournalError::Validation(_)));
        assert!(mock.requests().is_empty());
        assert!(toasts.is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_becomes_error_toast() {
        let mock = backend();
        let mut journal = Journal::new(ApiClient::with_transport(mock), "u1");
        let mut toasts = Notifications::default();
        journal.refresh().await;

        let err = journal
            .update("j1", "Monday", "edited", &mut toasts)
            .await
            .unwrap_err();
        assert!(matches!(err, JournalError::Api(ref e) if e.is_payload_too_large()));

        let toast = toasts.visible().next().unwrap();
        assert_eq!(toast.variant, ToastVariant::Error);
        assert_eq!(toast.message, "The uploaded image is too large");
        assert_eq!(journal.entries()[0].content, "Long day");

        journal.delete("j1", &mut toasts).await.unwrap();
        assert!(journal.entries().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_in_place_and_delete_removes() {
        let mock = Arc::new(MockTransport::new(|request| match (request.method, request.path.as_str()) {
            (Method::Get, "journals/user/u1") => Ok(json!([
                {"_id": "j3", "user": "u1", "title": "Wednesday", "content": "Rain"},
                {"_id": "j1", "user": "u1", "title": "Monday", "content": "Long day"}
            ])),
            (Method::Put, "journals/j1") => {
                let body = request.body.clone().unwrap_or_default();
                Ok(json!({"_id": "j1", "user": "u1", "title": body["title"], "content": body["content"]}))
            }
            (Method::Delete, "journals/j3") => Ok(serde_json::Value::Null),
            (method, path) => panic!("unexpected {} {}", method, path),
        }));
        let mut journal = Journal::new(ApiClient::with_transport(mock.clone()), "u1");
        let mut toasts = Notifications::default();
        journal.refresh().await;

        let updated = journal
            .update("j1", "Monday", " Shorter than it felt ", &mut toasts)
            .await
            .unwrap();
        assert_eq!(updated.content, "Shorter than it felt");
        assert_eq!(journal.entries().len(), 2);
        assert_eq!(journal.entries()[1].id, "j1");
        assert_eq!(journal.entries()[1].content, "Shorter than it felt");
        assert_eq!(mock.count(Method::Put, "journals/j1"), 1);

        journal.delete("j3", &mut toasts).await.unwrap();
        let ids: Vec<&str> = journal.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["j1"]);
        assert_eq!(mock.count(Method::Delete, "journals/j3"), 1);
        assert!(toasts.visible().all(|t| t.variant == ToastVariant::Success));
    }
}
