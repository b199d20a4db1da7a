//! Conversation View
//!
//! Two-party message thread kept fresh by polling. Each fetch replaces the
//! transcript wholesale; ordering is whatever the backend returns.
//!
//! ## Lifecycle
//!
//! 1. `open(partner)` tears down any previous partner and starts a poller
//!    (immediate fetch, then one per interval)
//! 2. A Therapist partner also gets a single, non-blocking profile fetch
//! 3. `send()` posts the draft and appends the server's copy
//! 4. `close()` (or drop) aborts the poller

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::{ApiClient, RecoveredError};
use crate::model::{Message, NewMessage, ParticipantRef, PartnerKind, Profile};

/// One rendered message
#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub id: String,
    pub text: String,
    /// Sent by the viewer (right-aligned)
    pub own: bool,
    /// Partner avatar, only on the partner's bubbles
    pub avatar: Option<String>,
}

/// Result of a send attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Empty or whitespace-only draft, or no open conversation; nothing sent
    Skipped,
    Sent(Message),
    /// Logged; the draft is left untouched
    Failed(RecoveredError),
}

#[derive(Debug, Default)]
struct ThreadState {
    partner: Option<ParticipantRef>,
    /// Bumped on every open/close; late responses for older values are dropped
    generation: u64,
    messages: Vec<Message>,
    partner_profile: Option<Profile>,
    draft: String,
    last_error: Option<RecoveredError>,
}

struct Shared {
    api: ApiClient,
    me: ParticipantRef,
    state: RwLock<ThreadState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn changed(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

/// Polling view over one (self, partner) thread at a time
pub struct ConversationView {
    shared: Arc<Shared>,
    poll_interval: Duration,
    poller: Option<JoinHandle<()>>,
    profile_task: Option<JoinHandle<()>>,
}

impl ConversationView {
    pub fn new(api: ApiClient, me: ParticipantRef, poll_interval: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                api,
                me,
                state: RwLock::new(ThreadState::default()),
                revision,
            }),
            poll_interval,
            poller: None,
            profile_task: None,
        }
    }

    /// Show the thread with `partner`, discarding whatever was shown before
    pub async fn open(&mut self, partner: ParticipantRef) {
        self.stop_tasks();

        let generation = {
            let mut state = self.shared.state.write().await;
            state.generation += 1;
            state.partner = Some(partner.clone());
            state.messages.clear();
            state.partner_profile = None;
            state.draft.clear();
            state.last_error = None;
            state.generation
        };
        self.shared.changed();

        tracing::info!(
            partner_id = %partner.id,
            partner_kind = %partner.kind,
            "Opening conversation"
        );

        if partner.kind == PartnerKind::Therapist {
            self.profile_task = Some(tokio::spawn(fetch_partner_profile(
                Arc::clone(&self.shared),
                partner.clone(),
                generation,
            )));
        }

        self.poller = Some(tokio::spawn(poll_thread(
            Arc::clone(&self.shared),
            partner,
            generation,
            self.poll_interval,
        )));
    }

    /// Stop polling and drop the transcript
    pub async fn close(&mut self) {
        self.stop_tasks();

        let mut state = self.shared.state.write().await;
        state.generation += 1;
        if let Some(partner) = state.partner.take() {
            tracing::info!(partner_id = %partner.id, "Closing conversation");
        }
        state.messages.clear();
        state.partner_profile = None;
        drop(state);
        self.shared.changed();
    }

    fn stop_tasks(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
        if let Some(handle) = self.profile_task.take() {
            handle.abort();
        }
    }

    pub fn me(&self) -> &ParticipantRef {
        &self.shared.me
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Revision counter bumped on every visible change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    pub async fn partner(&self) -> Option<ParticipantRef> {
        self.shared.state.read().await.partner.clone()
    }

    pub async fn partner_profile(&self) -> Option<Profile> {
        self.shared.state.read().await.partner_profile.clone()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.shared.state.read().await.messages.clone()
    }

    /// Index of the newest entry; the transcript should be scrolled here
    pub async fn scroll_anchor(&self) -> Option<usize> {
        self.shared.state.read().await.messages.len().checked_sub(1)
    }

    pub async fn last_error(&self) -> Option<RecoveredError> {
        self.shared.state.read().await.last_error.clone()
    }

    pub async fn draft(&self) -> String {
        self.shared.state.read().await.draft.clone()
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.shared.state.write().await.draft = text.into();
    }

    pub async fn bubbles(&self) -> Vec<Bubble> {
        let state = self.shared.state.read().await;
        let avatar = state
            .partner_profile
            .as_ref()
            .and_then(|p| p.image())
            .map(str::to_string);

        state
            .messages
            .iter()
            .map(|m| {
                let own = m.from == self.shared.me.id;
                Bubble {
                    id: m.id.clone(),
                    text: m.message.clone(),
                    own,
                    avatar: if own { None } else { avatar.clone() },
                }
            })
            .collect()
    }

    /// Post the current draft.
    ///
    /// The message only shows up once the backend confirms it.
    pub async fn send(&self) -> SendOutcome {
        post_draft(&self.shared).await
    }

    /// Set the draft and send it
    pub async fn send_text(&self, text: impl Into<String>) -> SendOutcome {
        self.set_draft(text).await;
        self.send().await
    }
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

async fn post_draft(shared: &Shared) -> SendOutcome {
    let (partner, text, generation) = {
        let state = shared.state.read().await;
        if state.draft.trim().is_empty() {
            return SendOutcome::Skipped;
        }
        match &state.partner {
            Some(partner) => (partner.clone(), state.draft.clone(), state.generation),
            None => return SendOutcome::Skipped,
        }
    };

    let payload = NewMessage::between(&shared.me, &partner, text);
    match shared.api.send_message(&payload).await {
        Ok(message) => {
            let mut state = shared.state.write().await;
            let current = state.generation == generation;
            // a poll that landed during the POST may already carry it
            if current && !state.messages.iter().any(|m| m.id == message.id) {
                state.messages.push(message.clone());
            }
            if current {
                state.draft.clear();
            }
            drop(state);
            if current {
                shared.changed();
            }

            tracing::debug!(message_id = %message.id, "Message sent");
            SendOutcome::Sent(message)
        }
        Err(e) => SendOutcome::Failed(RecoveredError::record("send message", &e)),
    }
}

async fn poll_thread(
    shared: Arc<Shared>,
    partner: ParticipantRef,
    generation: u64,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let result = shared.api.fetch_thread(&shared.me, &partner).await;

        let mut state = shared.state.write().await;
        if state.generation != generation {
            return;
        }

        let changed = match result {
            Ok(messages) => {
                state.last_error = None;
                if state.messages != messages {
                    tracing::trace!(count = messages.len(), "Thread updated");
                    state.messages = messages;
                    true
                } else {
                    false
                }
            }
            Err(e) => {
                state.last_error = Some(RecoveredError::record("fetch thread", &e));
                false
            }
        };
        drop(state);

        if changed {
            shared.changed();
        }
    }
}

async fn fetch_partner_profile(shared: Arc<Shared>, partner: ParticipantRef, generation: u64) {
    let result = shared.api.therapist(&partner.id).await;

    let mut state = shared.state.write().await;
    if state.generation != generation {
        return;
    }
    match result {
        Ok(profile) => state.partner_profile = Some(Profile::Therapist(profile)),
        Err(e) => state.last_error = Some(RecoveredError::record("fetch partner profile", &e)),
    }
    drop(state);
    shared.changed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiRequest, ApiResult, Method, MockTransport, Transport};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(3);

    fn message(id: &str, from: &str, to: &str, text: &str) -> Value {
        json!({"_id": id, "from": from, "to": to, "message": text})
    }

    fn backend() -> Arc<MockTransport> {
        Arc::new(MockTransport::new(|request: &ApiRequest| {
            match (request.method, request.path.as_str()) {
                (Method::Get, "messages") => match request.query_value("to") {
                    Some("t1") => Ok(json!([message("m1", "u1", "t1", "hi")])),
                    Some("t2") => Ok(json!([message("m9", "t2", "u1", "hello from t2")])),
                    _ => Ok(json!([])),
                },
                (Method::Get, "therapists/t1") => {
                    Ok(json!({"_id": "t1", "name": "Dr. Lee", "image": "lee.png"}))
                }
                (Method::Get, "therapists/t2") => Ok(json!({"_id": "t2", "name": "Dr. Roe"})),
                (Method::Post, "messages") => {
                    let body = request.body.clone().unwrap_or(Value::Null);
                    Ok(json!({
                        "_id": "m2",
                        "from": body["from"],
                        "fromModel": body["fromModel"],
                        "to": body["to"],
                        "toModel": body["toModel"],
                        "message": body["message"],
                    }))
                }
                (method, path) => panic!("unexpected {} {}", method, path),
            }
        }))
    }

    fn view(mock: &Arc<MockTransport>) -> ConversationView {
        ConversationView::new(
            ApiClient::with_transport(mock.clone()),
            ParticipantRef::user("u1"),
            INTERVAL,
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_fetches_profile_and_thread_once() {
        let mock = backend();
        let mut view = view(&mock);

        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        assert_eq!(mock.count(Method::Get, "therapists/t1"), 1);
        assert_eq!(mock.count(Method::Get, "messages"), 1);
        assert_eq!(
            view.partner_profile().await.map(|p| p.name().to_string()),
            Some("Dr. Lee".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_partner_skips_profile_fetch() {
        let mock = backend();
        let mut view = ConversationView::new(
            ApiClient::with_transport(mock.clone()),
            ParticipantRef::therapist("t1"),
            INTERVAL,
        );

        view.open(ParticipantRef::user("u1")).await;
        settle().await;

        assert_eq!(mock.count(Method::Get, "messages"), 1);
        assert!(mock.requests().iter().all(|r| !r.path.starts_with("therapists/")));
        assert!(mock.requests().iter().all(|r| !r.path.starts_with("users/")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_message_alignment() {
        let mock = backend();
        let mut view = view(&mock);

        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        let bubbles = view.bubbles().await;
        assert_eq!(bubbles.len(), 1);
        assert_eq!(bubbles[0].text, "hi");
        assert!(bubbles[0].own);
        assert_eq!(bubbles[0].avatar, None);
        assert_eq!(view.scroll_anchor().await, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval_and_replaces_transcript() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mock = Arc::new(MockTransport::new(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let thread: Vec<Value> = (0..n)
                .map(|i| message(&format!("m{}", i), "t1", "u1", "again"))
                .collect();
            Ok(Value::Array(thread))
        }));
        let mut view = ConversationView::new(
            ApiClient::with_transport(mock.clone()),
            ParticipantRef::user("u1"),
            INTERVAL,
        );

        view.open(ParticipantRef::user("u2")).await;
        settle().await;
        assert_eq!(view.messages().await.len(), 1);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(mock.count(Method::Get, "messages"), 2);
        assert_eq!(view.messages().await.len(), 2);
        assert_eq!(view.scroll_anchor().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_draft_is_never_posted() {
        let mock = backend();
        let mut view = view(&mock);
        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        assert_eq!(view.send_text("").await, SendOutcome::Skipped);
        assert_eq!(view.send_text("   \n\t").await, SendOutcome::Skipped);
        assert_eq!(mock.count(Method::Post, "messages"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_appends_once_and_clears_draft() {
        let mock = backend();
        let mut view = view(&mock);
        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        let outcome = view.send_text("how are you?").await;
        let sent = match outcome {
            SendOutcome::Sent(message) => message,
            other => panic!("expected Sent, got {:?}", other),
        };

        assert_eq!(sent.message, "how are you?");
        let messages = view.messages().await;
        assert_eq!(messages.iter().filter(|m| m.id == "m2").count(), 1);
        assert_eq!(view.draft().await, "");

        let body = mock
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Post)
            .and_then(|r| r.body)
            .unwrap();
        assert_eq!(
            body,
            json!({
                "from": "u1",
                "fromModel": "User",
                "to": "t1",
                "toModel": "Therapist",
                "message": "how are you?"
            })
        );
    }

    /// Stores a posted message right away, then stalls before replying
    struct SlowPost {
        thread: std::sync::Mutex<Vec<Value>>,
        stall: Duration,
    }

    impl SlowPost {
        fn new(stall: Duration) -> Arc<Self> {
            Arc::new(Self {
                thread: std::sync::Mutex::new(Vec::new()),
                stall,
            })
        }
    }

    #[async_trait::async_trait]
    impl Transport for SlowPost {
        async fn execute(&self, request: ApiRequest) -> ApiResult<Value> {
            match request.method {
                Method::Post => {
                    let body = request.body.unwrap_or(Value::Null);
                    let stored = {
                        let mut thread = self.thread.lock().unwrap();
                        let stored = json!({
                            "_id": format!("m{}", thread.len() + 1),
                            "from": body["from"],
                            "to": body["to"],
                            "message": body["message"],
                        });
                        thread.push(stored.clone());
                        stored
                    };
                    tokio::time::sleep(self.stall).await;
                    Ok(stored)
                }
                _ => {
                    let to = request.query_value("to").unwrap_or_default().to_string();
                    let thread = self.thread.lock().unwrap();
                    Ok(Value::Array(
                        thread.iter().filter(|m| m["to"] == to).cloned().collect(),
                    ))
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_overlapping_poll_appends_once() {
        let backend = SlowPost::new(INTERVAL + Duration::from_secs(1));
        let mut view = ConversationView::new(
            ApiClient::with_transport(backend),
            ParticipantRef::user("u1"),
            INTERVAL,
        );
        view.open(ParticipantRef::user("u2")).await;
        settle().await;

        let outcome = view.send_text("hi").await;

        assert!(matches!(outcome, SendOutcome::Sent(ref m) if m.id == "m1"));
        let ids: Vec<String> = view.messages().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m1".to_string()]);
        assert_eq!(view.draft().await, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_reply_after_switch_is_not_applied() {
        let backend = SlowPost::new(INTERVAL + Duration::from_secs(1));
        let mut view = ConversationView::new(
            ApiClient::with_transport(backend),
            ParticipantRef::user("u1"),
            INTERVAL,
        );
        view.open(ParticipantRef::user("u2")).await;
        settle().await;
        view.set_draft("for u2").await;

        let shared = Arc::clone(&view.shared);
        let pending = tokio::spawn(async move { post_draft(&shared).await });
        settle().await;

        view.open(ParticipantRef::user("u3")).await;
        settle().await;
        view.set_draft("for u3").await;
        let mut revisions = view.subscribe();
        revisions.borrow_and_update();

        let outcome = pending.await.unwrap();

        assert!(matches!(outcome, SendOutcome::Sent(_)));
        assert!(!revisions.has_changed().unwrap());
        assert!(view.messages().await.is_empty());
        assert_eq!(view.draft().await, "for u3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_without_partner_is_skipped() {
        let mock = backend();
        let view = view(&mock);

        assert_eq!(view.send_text("hello").await, SendOutcome::Skipped);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_keeps_draft() {
        let mock = Arc::new(MockTransport::new(|request| match request.method {
            Method::Post => Err(ApiError::Transport("offline".to_string())),
            _ => Ok(json!([])),
        }));
        let mut view = ConversationView::new(
            ApiClient::with_transport(mock.clone()),
            ParticipantRef::user("u1"),
            INTERVAL,
        );
        view.open(ParticipantRef::user("u2")).await;
        settle().await;

        let outcome = view.send_text("still here").await;
        assert!(matches!(outcome, SendOutcome::Failed(ref e) if e.context == "send message"));
        assert_eq!(view.draft().await, "still here");
        assert!(view.messages().await.is_empty());
        assert_eq!(mock.count(Method::Post, "messages"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_stops_polling() {
        let mock = backend();
        let mut view = view(&mock);
        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;
        assert_eq!(mock.count(Method::Get, "messages"), 1);

        view.close().await;
        tokio::time::sleep(INTERVAL * 2).await;

        assert_eq!(mock.count(Method::Get, "messages"), 1);
        assert!(view.messages().await.is_empty());
        assert!(view.partner().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let mock = backend();
        let mut view = view(&mock);
        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        drop(view);
        tokio::time::sleep(INTERVAL * 2).await;

        assert_eq!(mock.count(Method::Get, "messages"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_partner_discards_and_refetches() {
        let mock = backend();
        let mut view = view(&mock);
        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        view.open(ParticipantRef::therapist("t2")).await;
        settle().await;

        let messages = view.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "m9");
        assert!(!view.bubbles().await[0].own);
        assert_eq!(mock.count(Method::Get, "therapists/t2"), 1);

        tokio::time::sleep(INTERVAL).await;
        let to_t1 = mock
            .requests()
            .iter()
            .filter(|r| r.path == "messages" && r.query_value("to") == Some("t1"))
            .count();
        assert_eq!(to_t1, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_is_recovered() {
        let fail = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fail);
        let mock = Arc::new(MockTransport::new(move |_| {
            if flag.load(Ordering::SeqCst) {
                Err(ApiError::Status {
                    status: 502,
                    message: "Bad gateway".to_string(),
                })
            } else {
                Ok(json!([message("m1", "u2", "u1", "hey")]))
            }
        }));
        let mut view = ConversationView::new(
            ApiClient::with_transport(mock.clone()),
            ParticipantRef::user("u1"),
            INTERVAL,
        );
        view.open(ParticipantRef::user("u2")).await;
        settle().await;

        fail.store(true, Ordering::SeqCst);
        tokio::time::sleep(INTERVAL).await;

        assert_eq!(view.messages().await.len(), 1);
        let error = view.last_error().await.unwrap();
        assert_eq!(error.status, Some(502));
        assert_eq!(error.context, "fetch thread");
    }

    #[tokio::test(start_paused = true)]
    async fn test_revision_bumps_on_change() {
        let mock = backend();
        let mut view = view(&mock);
        let mut revisions = view.subscribe();

        view.open(ParticipantRef::therapist("t1")).await;
        settle().await;

        assert!(revisions.has_changed().unwrap());
        let seen = *revisions.borrow_and_update();
        assert!(seen >= 2);
    }
}
