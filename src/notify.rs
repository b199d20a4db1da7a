//! Toast Notifications
//!
//! Transient success and error messages. Write-path failures end up here.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Success,
    Error,
    Info,
}

impl ToastVariant {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastVariant::Success => "✓",
            ToastVariant::Error => "✕",
            ToastVariant::Info => "ℹ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: String,
    pub variant: ToastVariant,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Queue of visible toasts, oldest first
#[derive(Debug)]
pub struct Notifications {
    toasts: VecDeque<Toast>,
    ttl: Duration,
    max_visible: usize,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(Duration::seconds(4), 3)
    }
}

impl Notifications {
    pub fn new(ttl: Duration, max_visible: usize) -> Self {
        Self {
            toasts: VecDeque::new(),
            ttl,
            max_visible: max_visible.max(1),
        }
    }

    pub fn push(&mut self, variant: ToastVariant, message: impl Into<String>) -> &Toast {
        if self.toasts.len() == self.max_visible {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            id: uuid::Uuid::new_v4().to_string(),
            variant,
            message: message.into(),
            created_at: Utc::now(),
        });
        &self.toasts[self.toasts.len() - 1]
    }

    pub fn success(&mut self, message: impl Into<String>) -> &Toast {
        self.push(ToastVariant::Success, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> &Toast {
        self.push(ToastVariant::Info, message)
    }

    /// Surface a failed write to the user
    pub fn api_error(&mut self, action: &str, err: &ApiError) -> &Toast {
        tracing::error!(action, error = %err, "Write request failed");
        self.push(ToastVariant::Error, err.user_message())
    }

    pub fn dismiss(&mut self, id: &str) {
        self.toasts.retain(|t| t.id != id);
    }

    /// Drop toasts older than the time-to-live
    pub fn expire(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.toasts.retain(|t| now - t.created_at < ttl);
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
