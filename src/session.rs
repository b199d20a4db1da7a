//! Session Identity
//!
//! Holds who is signed in. One store is created per app and handed to every
//! view that needs it; it is the only shared mutable state in the client.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::{ApiClient, ApiResult, SessionCheck};
use crate::model::{Credentials, ParticipantRef, PartnerKind};

/// Auth flags carried alongside an identity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthFlags {
    pub authenticated: bool,
    pub onboarded: bool,
}

/// A signed-in user or therapist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub id: String,
    pub name: String,
    pub role: PartnerKind,
    pub flags: AuthFlags,
}

impl SessionIdentity {
    pub fn participant(&self) -> ParticipantRef {
        ParticipantRef::new(self.id.clone(), self.role)
    }

    fn from_check(role: PartnerKind, check: SessionCheck) -> Option<Self> {
        if !check.authenticated {
            return None;
        }
        let id = check.id?;
        Some(Self {
            id,
            name: check.name.unwrap_or_default(),
            role,
            flags: AuthFlags {
                authenticated: true,
                onboarded: check.onboarded,
            },
        })
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<SessionIdentity>,
    therapist: Option<SessionIdentity>,
    checked: bool,
}

/// Injectable session container
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot session check for both account kinds.
    ///
    /// Failures leave the slot empty; they are not fatal.
    pub async fn bootstrap(&self, api: &ApiClient) {
        let (user, therapist) = tokio::join!(
            api.check_session(PartnerKind::User),
            api.check_session(PartnerKind::Therapist)
        );

        let mut state = self.inner.write().await;
        state.user = Self::identity_from(PartnerKind::User, user);
        state.therapist = Self::identity_from(PartnerKind::Therapist, therapist);
        state.checked = true;

        tracing::info!(
            user = state.user.is_some(),
            therapist = state.therapist.is_some(),
            "Session check complete"
        );
    }

    fn identity_from(role: PartnerKind, result: ApiResult<SessionCheck>) -> Option<SessionIdentity> {
        match result {
            Ok(check) => SessionIdentity::from_check(role, check),
            Err(e) => {
                tracing::warn!(role = %role, error = %e, "Session check failed");
                None
            }
        }
    }

    /// Sign in through the backend and store the identity
    pub async fn sign_in(
        &self,
        api: &ApiClient,
        kind: PartnerKind,
        credentials: &Credentials,
    ) -> ApiResult<Option<SessionIdentity>> {
        let check = api.sign_in(kind, credentials).await?;
        let identity = SessionIdentity::from_check(kind, check);
        if let Some(identity) = &identity {
            self.set(identity.clone()).await;
        }
        Ok(identity)
    }

    /// Sign out through the backend, then clear the slot.
    ///
    /// The slot is cleared even when the call fails.
    pub async fn sign_out(&self, api: &ApiClient, kind: PartnerKind) -> ApiResult<()> {
        let result = api.sign_out(kind).await;
        self.clear_role(kind).await;
        result
    }

    pub async fn set(&self, identity: SessionIdentity) {
        let mut state = self.inner.write().await;
        match identity.role {
            PartnerKind::User => state.user = Some(identity),
            PartnerKind::Therapist => state.therapist = Some(identity),
        }
    }

    pub async fn set_onboarded(&self, role: PartnerKind, onboarded: bool) {
        let mut state = self.inner.write().await;
        let slot = match role {
            PartnerKind::User => state.user.as_mut(),
            PartnerKind::Therapist => state.therapist.as_mut(),
        };
        if let Some(identity) = slot {
            identity.flags.onboarded = onboarded;
        }
    }

    pub async fn clear_role(&self, role: PartnerKind) {
        let mut state = self.inner.write().await;
        match role {
            PartnerKind::User => state.user = None,
            PartnerKind::Therapist => state.therapist = None,
        }
    }

    /// Forget everything (full sign-out)
    pub async fn clear(&self) {
        let mut state = self.inner.write().await;
        state.user = None;
        state.therapist = None;
    }

    pub async fn user(&self) -> Option<SessionIdentity> {
        self.inner.read().await.user.clone()
    }

    pub async fn therapist(&self) -> Option<SessionIdentity> {
        self.inner.read().await.therapist.clone()
    }

    /// Whether the bootstrap check has run
    pub async fn is_checked(&self) -> bool {
        self.inner.read().await.checked
    }

    /// True when either a user or a therapist session is active
    pub async fn is_authenticated(&self) -> bool {
        let state = self.inner.read().await;
        state.user.is_some() || state.therapist.is_some()
    }

    /// The active identity; a user session wins over a therapist session
    pub async fn current(&self) -> Option<SessionIdentity> {
        let state = self.inner.read().await;
        state.user.clone().or_else(|| state.therapist.clone())
    }

    pub async fn current_participant(&self) -> Option<ParticipantRef> {
        self.current().await.map(|identity| identity.participant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Method, MockTransport};
    use serde_json::json;

    fn identity(id: &str, role: PartnerKind) -> SessionIdentity {
        SessionIdentity {
            id: id.to_string(),
            name: "Sam".to_string(),
            role,
            flags: AuthFlags {
                authenticated: true,
                onboarded: false,
            },
        }
    }

    #[tokio::test]
    async fn test_setters_and_clear() {
        let store = SessionStore::new();
        assert!(!store.is_authenticated().await);

        store.set(identity("t1", PartnerKind::Therapist)).await;
        assert!(store.is_authenticated().await);
        assert_eq!(
            store.current_participant().await,
            Some(ParticipantRef::therapist("t1"))
        );

        store.set(identity("u1", PartnerKind::User)).await;
        assert_eq!(store.current().await.unwrap().id, "u1");

        store.set_onboarded(PartnerKind::User, true).await;
        assert!(store.user().await.unwrap().flags.onboarded);

        store.clear().await;
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_bootstrap_reads_both_kinds() {
        let mock = Arc::new(MockTransport::new(|request| match request.path.as_str() {
            "users/check-session" => Ok(json!({"authenticated": true, "id": "u1", "name": "Ana"})),
            "therapists/check-session" => Err(ApiError::Status {
                status: 401,
                message: "Unauthorized".to_string(),
            }),
            other => panic!("unexpected path {}", other),
        }));
        let api = ApiClient::with_transport(mock.clone());
        let store = SessionStore::new();

        store.bootstrap(&api).await;

        assert!(store.is_checked().await);
        assert_eq!(store.user().await.unwrap().name, "Ana");
        assert!(store.therapist().await.is_none());
        assert_eq!(mock.count(Method::Get, "users/check-session"), 1);
        assert_eq!(mock.count(Method::Get, "therapists/check-session"), 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_on_failure() {
        let mock = Arc::new(MockTransport::new(|_| {
            Err(ApiError::Transport("offline".to_string()))
        }));
        let api = ApiClient::with_transport(mock);
        let store = SessionStore::new();
        store.set(identity("u1", PartnerKind::User)).await;

        assert!(store.sign_out(&api, PartnerKind::User).await.is_err());
        assert!(store.user().await.is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_check_yields_no_identity() {
        let mock = Arc::new(MockTransport::new(|_| Ok(json!({"authenticated": false}))));
        let api = ApiClient::with_transport(mock);
        let store = SessionStore::new();

        let signed_in = store
            .sign_in(
                &api,
                PartnerKind::User,
                &Credentials {
                    email: "a@b.c".to_string(),
                    password: "secret".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(signed_in.is_none());
        assert!(!store.is_authenticated().await);
    }
}
