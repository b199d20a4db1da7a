//! REST API Client
//!
//! Verb helpers plus the typed endpoint groups the views use. Every call is
//! a single attempt: no retry, no backoff.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::ApiResult;
use super::transport::{ApiRequest, HttpTransport, Method, Transport, TransportConfig};
use crate::model::{
    Advice, Answer, Article, Credentials, JournalDraft, JournalEntry, Message, NewMessage,
    ParticipantRef, PartnerKind, Question, Registration, TherapistMatch, TherapistProfile,
    UserProfile,
};

/// Handle to the backend. Clones share one transport (and its cookies).
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

/// Response of the session-check endpoints
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCheck {
    #[serde(default, alias = "loggedIn")]
    pub authenticated: bool,
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub onboarded: bool,
}

#[derive(Debug, Deserialize)]
struct ChatBotResponse {
    answer: String,
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

impl ApiClient {
    /// Client over the real HTTP transport
    pub fn connect(config: &TransportConfig) -> ApiResult<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Client over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let value = self.transport.execute(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    // ============ Verbs ============

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let request = query
            .iter()
            .fold(ApiRequest::new(Method::Get, path), |r, (k, v)| r.param(k, *v));
        self.call(request).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let request = ApiRequest::new(Method::Post, path).json(serde_json::to_value(body)?);
        self.call(request).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let request = ApiRequest::new(Method::Put, path).json(serde_json::to_value(body)?);
        self.call(request).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.transport
            .execute(ApiRequest::new(Method::Delete, path))
            .await?;
        Ok(())
    }

    // ============ Messages ============

    /// Two-party thread, as ordered by the backend
    pub async fn fetch_thread(
        &self,
        from: &ParticipantRef,
        to: &ParticipantRef,
    ) -> ApiResult<Vec<Message>> {
        self.get(
            "messages",
            &[
                ("from", from.id.as_str()),
                ("to", to.id.as_str()),
                ("fromModel", from.kind.as_str()),
                ("toModel", to.kind.as_str()),
            ],
        )
        .await
    }

    pub async fn send_message(&self, message: &NewMessage) -> ApiResult<Message> {
        self.post("messages", message).await
    }

    /// Everyone who has written to `to`. Threads are always between a user
    /// and a therapist, so ids are tagged with the other kind.
    pub async fn chatters(&self, to: &ParticipantRef) -> ApiResult<Vec<ParticipantRef>> {
        let ids: Vec<String> = self
            .get(
                "messages/chatters",
                &[("to", to.id.as_str()), ("toModel", to.kind.as_str())],
            )
            .await?;
        let kind = to.kind.counterpart();
        Ok(ids.into_iter().map(|id| ParticipantRef::new(id, kind)).collect())
    }

    /// Everyone `from` has written to, tagged with the other kind
    pub async fn chattees(&self, from: &ParticipantRef) -> ApiResult<Vec<ParticipantRef>> {
        let ids: Vec<String> = self
            .get(
                "messages/chattees",
                &[("from", from.id.as_str()), ("fromModel", from.kind.as_str())],
            )
            .await?;
        let kind = from.kind.counterpart();
        Ok(ids.into_iter().map(|id| ParticipantRef::new(id, kind)).collect())
    }

    // ============ Assistant ============

    pub async fn ask_chatbot(&self, question: &str) -> ApiResult<String> {
        let response: ChatBotResponse = self
            .post("chatBot", &json!({ "message": question }))
            .await?;
        Ok(response.answer)
    }

    // ============ Accounts ============

    pub async fn register_user(&self, form: &Registration) -> ApiResult<UserProfile> {
        self.post("users/register", form).await
    }

    pub async fn register_therapist(&self, form: &Registration) -> ApiResult<TherapistProfile> {
        self.post("therapists/register", form).await
    }

    pub async fn sign_in(&self, kind: PartnerKind, credentials: &Credentials) -> ApiResult<SessionCheck> {
        self.post(&format!("{}/login", kind.collection()), credentials)
            .await
    }

    pub async fn sign_out(&self, kind: PartnerKind) -> ApiResult<()> {
        let _: Value = self
            .post(&format!("{}/logout", kind.collection()), &json!({}))
            .await?;
        Ok(())
    }

    pub async fn check_session(&self, kind: PartnerKind) -> ApiResult<SessionCheck> {
        self.get(&format!("{}/check-session", kind.collection()), &[])
            .await
    }

    pub async fn user(&self, id: &str) -> ApiResult<UserProfile> {
        self.get(&format!("users/{}", segment(id)), &[]).await
    }

    pub async fn therapist(&self, id: &str) -> ApiResult<TherapistProfile> {
        self.get(&format!("therapists/{}", segment(id)), &[]).await
    }

    pub async fn therapists(&self) -> ApiResult<Vec<TherapistProfile>> {
        self.get("therapists", &[]).await
    }

    pub async fn update_user(&self, profile: &UserProfile) -> ApiResult<UserProfile> {
        self.put(&format!("users/{}", segment(&profile.id)), profile)
            .await
    }

    pub async fn update_therapist(&self, profile: &TherapistProfile) -> ApiResult<TherapistProfile> {
        self.put(&format!("therapists/{}", segment(&profile.id)), profile)
            .await
    }

    pub async fn delete_account(&self, account: &ParticipantRef) -> ApiResult<()> {
        self.delete(&format!("{}/{}", account.kind.collection(), segment(&account.id)))
            .await
    }

    // ============ Questionnaire ============

    pub async fn questions(&self, kind: PartnerKind) -> ApiResult<Vec<Question>> {
        self.get(&format!("{}-questions", kind.questionnaire_prefix()), &[])
            .await
    }

    pub async fn submit_answer(&self, kind: PartnerKind, answer: &Answer) -> ApiResult<Answer> {
        self.post(&format!("{}-answers", kind.questionnaire_prefix()), answer)
            .await
    }

    pub async fn answers(&self, kind: PartnerKind, owner_id: &str) -> ApiResult<Vec<Answer>> {
        self.get(
            &format!("{}-answers/{}", kind.questionnaire_prefix(), segment(owner_id)),
            &[],
        )
        .await
    }

    // ============ Matching ============

    /// Ranked matches; percentages are computed server-side
    pub async fn matches(&self, user_id: &str) -> ApiResult<Vec<TherapistMatch>> {
        self.get(&format!("matching/match/{}", segment(user_id)), &[])
            .await
    }

    // ============ Journal ============

    pub async fn journal_entries(&self, user_id: &str) -> ApiResult<Vec<JournalEntry>> {
        self.get(&format!("journals/user/{}", segment(user_id)), &[])
            .await
    }

    pub async fn create_journal_entry(&self, draft: &JournalDraft) -> ApiResult<JournalEntry> {
        self.post("journals", draft).await
    }

    pub async fn update_journal_entry(&self, id: &str, draft: &JournalDraft) -> ApiResult<JournalEntry> {
        self.put(&format!("journals/{}", segment(id)), draft).await
    }

    pub async fn delete_journal_entry(&self, id: &str) -> ApiResult<()> {
        self.delete(&format!("journals/{}", segment(id))).await
    }

    // ============ Dashboard ============

    pub async fn advice(&self, user_id: &str) -> ApiResult<Advice> {
        self.get(&format!("advice/{}", segment(user_id)), &[]).await
    }

    pub async fn daily_article(&self) -> ApiResult<Article> {
        self.get("articles/daily", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::api::transport::mock::MockTransport;

    fn client_with(mock: Arc<MockTransport>) -> ApiClient {
        ApiClient::with_transport(mock)
    }

    #[tokio::test]
    async fn test_fetch_thread_query() {
        let mock = Arc::new(MockTransport::new(|_| {
            Ok(json!([{"_id": "m1", "from": "u1", "to": "t1", "message": "hi"}]))
        }));
        let api = client_with(mock.clone());

        let thread = api
            .fetch_thread(&ParticipantRef::user("u1"), &ParticipantRef::therapist("t1"))
            .await
            .unwrap();
        assert_eq!(thread.len(), 1);

        let request = &mock.requests()[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "messages");
        assert_eq!(request.query_value("from"), Some("u1"));
        assert_eq!(request.query_value("to"), Some("t1"));
        assert_eq!(request.query_value("fromModel"), Some("User"));
        assert_eq!(request.query_value("toModel"), Some("Therapist"));
    }

    #[tokio::test]
    async fn test_chatbot_round_trip() {
        let mock = Arc::new(MockTransport::new(|request| {
            assert_eq!(request.body, Some(json!({"message": "Is my privacy protected?"})));
            Ok(json!({"answer": "Yes, always."}))
        }));
        let api = client_with(mock.clone());

        let answer = api.ask_chatbot("Is my privacy protected?").await.unwrap();
        assert_eq!(answer, "Yes, always.");
        assert_eq!(mock.count(Method::Post, "chatBot"), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_on_failure() {
        let mock = Arc::new(MockTransport::new(|_| {
            Err(ApiError::Transport("connection refused".to_string()))
        }));
        let api = client_with(mock.clone());

        assert!(api.therapists().await.is_err());
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let mock = Arc::new(MockTransport::new(|_| Ok(json!([]))));
        let api = client_with(mock.clone());

        api.matches("a b/c").await.unwrap();
        assert_eq!(mock.requests()[0].path, "matching/match/a%20b%2Fc");
    }

    #[tokio::test]
    async fn test_partner_lists() {
        let mock = Arc::new(MockTransport::new(|_| Ok(json!(["t1", "t2"]))));
        let api = client_with(mock.clone());

        let partners = api.chattees(&ParticipantRef::user("u1")).await.unwrap();
        assert_eq!(
            partners,
            vec![ParticipantRef::therapist("t1"), ParticipantRef::therapist("t2")]
        );
        assert_eq!(mock.requests()[0].query_value("fromModel"), Some("User"));
    }

    #[tokio::test]
    async fn test_partner_kind_follows_caller() {
        let mock = Arc::new(MockTransport::new(|_| Ok(json!(["x1"]))));
        let api = client_with(mock.clone());

        let chatters = api.chatters(&ParticipantRef::user("u1")).await.unwrap();
        assert_eq!(chatters, vec![ParticipantRef::therapist("x1")]);

        let chattees = api.chattees(&ParticipantRef::therapist("t1")).await.unwrap();
        assert_eq!(chattees, vec![ParticipantRef::user("x1")]);
    }
}
