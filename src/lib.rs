//! # Solace
//!
//! Headless client for the Solace therapy-matching service. The backend owns
//! all durable state; this crate owns API access, session identity and the
//! view models a front end renders.
//!
//! ## Modules
//!
//! - [`api`]: REST client, one transport seam, cookie-based sessions
//! - [`session`]: injectable store for the signed-in user/therapist
//! - [`conversation`]: polling two-party message thread
//! - [`assistant`]: scripted Q&A widget with a typewriter reveal
//! - [`questionnaire`], [`directory`], [`journal`], [`dashboard`], [`inbox`]
//! - [`cache`], [`notify`], [`validation`]: local storage, toasts, form checks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use solace::{ApiClient, Config, ConversationView, ParticipantRef, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let api = ApiClient::connect(&config.api.transport())?;
//!
//!     let session = SessionStore::new();
//!     session.bootstrap(&api).await;
//!
//!     if let Some(me) = session.current_participant().await {
//!         let mut view = ConversationView::new(api, me, config.messaging.poll_interval());
//!         view.open(ParticipantRef::therapist("t1")).await;
//!         view.send_text("Hello!").await;
//!         view.close().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod api;
pub mod assistant;
pub mod cache;
pub mod config;
pub mod conversation;
pub mod dashboard;
pub mod directory;
pub mod inbox;
pub mod journal;
pub mod logging;
pub mod model;
pub mod notify;
pub mod questionnaire;
pub mod reveal;
pub mod session;
pub mod validation;

pub use api::{ApiClient, ApiError, ApiResult, RecoveredError, Transport};
pub use assistant::{AssistantWidget, WidgetState, CANNED_QUESTIONS};
pub use cache::LocalCache;
pub use config::{Config, ConfigError};
pub use conversation::{Bubble, ConversationView, SendOutcome};
pub use model::{Message, ParticipantRef, PartnerKind};
pub use notify::Notifications;
pub use session::{SessionIdentity, SessionStore};
