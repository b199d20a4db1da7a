//! Transport Objects
//!
//! Thin JSON shapes exchanged with the backend. The client never holds
//! authoritative copies of these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which kind of record sits on the other side of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartnerKind {
    User,
    Therapist,
}

impl PartnerKind {
    /// Model tag used in query strings and payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            PartnerKind::User => "User",
            PartnerKind::Therapist => "Therapist",
        }
    }

    /// Collection prefix for account endpoints
    pub fn collection(&self) -> &'static str {
        match self {
            PartnerKind::User => "users",
            PartnerKind::Therapist => "therapists",
        }
    }

    /// The other side of a conversation
    pub fn counterpart(&self) -> PartnerKind {
        match self {
            PartnerKind::User => PartnerKind::Therapist,
            PartnerKind::Therapist => PartnerKind::User,
        }
    }

    /// Prefix for questionnaire endpoints
    pub fn questionnaire_prefix(&self) -> &'static str {
        match self {
            PartnerKind::User => "user",
            PartnerKind::Therapist => "therapist",
        }
    }
}

impl std::fmt::Display for PartnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(PartnerKind::User),
            "therapist" => Ok(PartnerKind::Therapist),
            other => Err(format!("unknown partner kind: {}", other)),
        }
    }
}

/// Reference to one side of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: String,
    pub kind: PartnerKind,
}

impl ParticipantRef {
    pub fn new(id: impl Into<String>, kind: PartnerKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self::new(id, PartnerKind::User)
    }

    pub fn therapist(id: impl Into<String>) -> Self {
        Self::new(id, PartnerKind::Therapist)
    }
}

/// A direct message as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub from: String,
    #[serde(default = "default_user_kind")]
    pub from_model: PartnerKind,
    pub to: String,
    #[serde(default = "default_therapist_kind")]
    pub to_model: PartnerKind,
    pub message: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_user_kind() -> PartnerKind {
    PartnerKind::User
}

fn default_therapist_kind() -> PartnerKind {
    PartnerKind::Therapist
}

/// Payload for `POST /messages`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub from: String,
    pub from_model: PartnerKind,
    pub to: String,
    pub to_model: PartnerKind,
    pub message: String,
}

impl NewMessage {
    pub fn between(from: &ParticipantRef, to: &ParticipantRef, message: impl Into<String>) -> Self {
        Self {
            from: from.id.clone(),
            from_model: from.kind,
            to: to.id.clone(),
            to_model: to.kind,
            message: message.into(),
        }
    }
}

/// Client account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Therapist account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub years_of_experience: Option<u32>,
}

/// Either kind of profile, used to decorate conversation partners
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    User(UserProfile),
    Therapist(TherapistProfile),
}

impl Profile {
    pub fn id(&self) -> &str {
        match self {
            Profile::User(u) => &u.id,
            Profile::Therapist(t) => &t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Profile::User(u) => &u.name,
            Profile::Therapist(t) => &t.name,
        }
    }

    pub fn image(&self) -> Option<&str> {
        match self {
            Profile::User(u) => u.image.as_deref(),
            Profile::Therapist(t) => t.image.as_deref(),
        }
    }
}

/// Registration payload shared by both account kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Sign-in payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A ranked therapist match for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistMatch {
    pub therapist: TherapistProfile,
    pub match_percentage: f64,
}

/// Onboarding question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Answer to one onboarding question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub owner_id: String,
    pub question_id: String,
    pub answer: String,
}

/// Journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating or editing a journal entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalDraft {
    pub user: String,
    pub title: String,
    pub content: String,
}

/// Personalised advice shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub advice: String,
}

/// Daily article shown on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}
