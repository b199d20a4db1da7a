//! Assistant Widget
//!
//! Floating Q&A helper. Each question is a single backend round trip; the
//! reply is then revealed locally, one character at a time.
//!
//! ```text
//! Idle --open--> Open --ask--> Awaiting --answer--> Streaming --done--> Open
//!   ^______________________ close / click outside ____________________|
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

use crate::api::{ApiClient, RecoveredError};
use crate::reveal::Typewriter;
use crate::session::SessionStore;

/// One-click questions offered in the widget
pub const CANNED_QUESTIONS: &[&str] = &[
    "How does therapist matching work?",
    "Is my privacy protected?",
    "How do I message my therapist?",
    "Can I change my therapist later?",
    "What is the journal for?",
];

/// Shown instead of an answer when a signed-out visitor types a question
pub const SIGN_IN_NOTICE: &str = "Please sign in or create an account to chat with our assistant.";

/// Shown after the transcript while a reply is being revealed
pub const CURSOR: char = '▍';

/// Who wrote a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub origin: Origin,
    pub text: String,
}

impl TranscriptEntry {
    fn user(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            text: text.into(),
        }
    }

    fn bot(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Bot,
            text: text.into(),
        }
    }
}

/// Visible widget state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Idle,
    Open,
    Awaiting,
    Streaming,
}

/// How a question entered the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSource {
    FreeText,
    Canned,
}

/// Whether asking from `source` needs an active session.
///
/// Canned questions are answered for everyone; typed questions are not.
pub fn requires_session(source: QuestionSource) -> bool {
    matches!(source, QuestionSource::FreeText)
}

/// What happened to a submitted question
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// Blank input, unknown canned index, or a question already in flight
    Ignored,
    /// Signed out: echoed plus the sign-in notice, no backend call
    SignInRequired,
    Answered(String),
    Failed(RecoveredError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Ready,
    Awaiting,
    Streaming,
}

#[derive(Debug)]
struct WidgetInner {
    visible: bool,
    phase: Phase,
    transcript: Vec<TranscriptEntry>,
    last_error: Option<RecoveredError>,
}

/// Snapshot published after every transcript or state change
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub state: WidgetState,
    pub transcript: Vec<TranscriptEntry>,
    pub cursor_visible: bool,
}

/// Scripted assistant widget
#[derive(Clone)]
pub struct AssistantWidget {
    api: ApiClient,
    session: SessionStore,
    reveal_delay: Duration,
    inner: Arc<RwLock<WidgetInner>>,
    view: Arc<watch::Sender<WidgetView>>,
}

impl AssistantWidget {
    pub fn new(api: ApiClient, session: SessionStore, reveal_delay: Duration) -> Self {
        let (view, _) = watch::channel(WidgetView {
            state: WidgetState::Idle,
            transcript: Vec::new(),
            cursor_visible: false,
        });
        Self {
            api,
            session,
            reveal_delay,
            inner: Arc::new(RwLock::new(WidgetInner {
                visible: false,
                phase: Phase::Ready,
                transcript: Vec::new(),
                last_error: None,
            })),
            view: Arc::new(view),
        }
    }

    /// Receive a snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<WidgetView> {
        self.view.subscribe()
    }

    fn publish(&self, inner: &WidgetInner) {
        let snapshot = WidgetView {
            state: state_of(inner),
            transcript: inner.transcript.clone(),
            cursor_visible: inner.phase == Phase::Streaming,
        };
        self.view.send_replace(snapshot);
    }

    pub async fn open(&self) {
        self.set_visible(true).await;
    }

    pub async fn close(&self) {
        self.set_visible(false).await;
    }

    /// Clicking anywhere outside the widget hides it
    pub async fn click_outside(&self) {
        self.close().await;
    }

    pub async fn toggle(&self) {
        let visible = self.inner.read().await.visible;
        self.set_visible(!visible).await;
    }

    async fn set_visible(&self, visible: bool) {
        let mut inner = self.inner.write().await;
        inner.visible = visible;
        self.publish(&inner);
    }

    pub async fn state(&self) -> WidgetState {
        state_of(&*self.inner.read().await)
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.read().await.transcript.clone()
    }

    /// The reveal cursor shows only while a reply is streaming
    pub async fn cursor_visible(&self) -> bool {
        self.inner.read().await.phase == Phase::Streaming
    }

    pub async fn last_error(&self) -> Option<RecoveredError> {
        self.inner.read().await.last_error.clone()
    }

    /// Submit typed text
    pub async fn submit_text(&self, text: &str) -> AskOutcome {
        let text = text.trim();
        if text.is_empty() {
            return AskOutcome::Ignored;
        }
        self.ask(text, QuestionSource::FreeText).await
    }

    /// Ask one of [`CANNED_QUESTIONS`] by index
    pub async fn ask_canned(&self, index: usize) -> AskOutcome {
        match CANNED_QUESTIONS.get(index) {
            Some(question) => self.ask(question, QuestionSource::Canned).await,
            None => AskOutcome::Ignored,
        }
    }

    async fn ask(&self, question: &str, source: QuestionSource) -> AskOutcome {
        let signed_in = self.session.is_authenticated().await;

        {
            let mut inner = self.inner.write().await;
            if inner.phase != Phase::Ready {
                return AskOutcome::Ignored;
            }
            inner.transcript.push(TranscriptEntry::user(question));

            if requires_session(source) && !signed_in {
                inner.transcript.push(TranscriptEntry::bot(SIGN_IN_NOTICE));
                self.publish(&inner);
                return AskOutcome::SignInRequired;
            }

            inner.phase = Phase::Awaiting;
            self.publish(&inner);
        }

        let answer = match self.api.ask_chatbot(question).await {
            Ok(answer) => answer,
            Err(e) => {
                let error = RecoveredError::record("ask assistant", &e);
                let mut inner = self.inner.write().await;
                inner.phase = Phase::Ready;
                inner.last_error = Some(error.clone());
                self.publish(&inner);
                return AskOutcome::Failed(error);
            }
        };

        self.reveal(answer.clone()).await;
        AskOutcome::Answered(answer)
    }

    /// Reveal a complete reply into a fresh bot entry
    async fn reveal(&self, answer: String) {
        let slot = {
            let mut inner = self.inner.write().await;
            inner.phase = Phase::Streaming;
            inner.last_error = None;
            inner.transcript.push(TranscriptEntry::bot(String::new()));
            self.publish(&inner);
            inner.transcript.len() - 1
        };

        let mut typewriter = Typewriter::new(answer);
        while let Some(ch) = typewriter.next_char() {
            {
                let mut inner = self.inner.write().await;
                inner.transcript[slot].text.push(ch);
                self.publish(&inner);
            }
            tokio::time::sleep(self.reveal_delay).await;
        }

        let mut inner = self.inner.write().await;
        inner.phase = Phase::Ready;
        self.publish(&inner);
    }
}

fn state_of(inner: &WidgetInner) -> WidgetState {
    if !inner.visible {
        return WidgetState::Idle;
    }
    match inner.phase {
        Phase::Ready => WidgetState::Open,
        Phase::Awaiting => WidgetState::Awaiting,
        Phase::Streaming => WidgetState::Streaming,
    }
}
