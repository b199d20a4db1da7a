//! Form Validation
//!
//! Client-side checks that run before any network call. Failures are
//! reported per field so they can be shown inline.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::model::{JournalDraft, Registration};

pub const MIN_PASSWORD_LEN: usize = 8;

/// A single inline error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{} field(s) need attention", .0.len())]
    Fields(Vec<FieldError>),

    #[error("Please select an answer before continuing")]
    NoAnswerSelected,

    #[error("Option {0} does not exist for this question")]
    UnknownOption(usize),
}

impl ValidationError {
    /// Inline message for `field`, if any
    pub fn message_for(&self, field: &str) -> Option<&str> {
        match self {
            ValidationError::Fields(errors) => errors
                .iter()
                .find(|e| e.field == field)
                .map(|e| e.message.as_str()),
            _ => None,
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str, label: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{} is required", label)));
        false
    } else {
        true
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::Fields(errors))
    }
}

pub fn validate_registration(form: &Registration) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    require(&mut errors, "name", &form.name, "Name");
    require(&mut errors, "username", &form.username, "Username");
    if require(&mut errors, "email", &form.email, "Email") && !is_valid_email(&form.email) {
        errors.push(FieldError::new("email", "Enter a valid email address"));
    }
    if require(&mut errors, "password", &form.password, "Password")
        && form.password.chars().count() < MIN_PASSWORD_LEN
    {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    finish(errors)
}

pub fn validate_journal(draft: &JournalDraft) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    require(&mut errors, "title", &draft.title, "Title");
    require(&mut errors, "content", &draft.content, "Entry");
    finish(errors)
}
