//! Inbox
//!
//! Distinct conversation partners for the signed-in identity. Therapists see
//! who wrote to them; users see who they wrote to.

use crate::api::{ApiClient, RecoveredError};
use crate::model::{ParticipantRef, PartnerKind};

/// Partners list, or the empty list plus the recovered error
pub async fn load_partners(
    api: &ApiClient,
    me: &ParticipantRef,
) -> (Vec<ParticipantRef>, Option<RecoveredError>) {
    let result = match me.kind {
        PartnerKind::Therapist => api.chatters(me).await,
        PartnerKind::User => api.chattees(me).await,
    };

    match result {
        Ok(partners) => (dedup(partners), None),
        Err(e) => (Vec::new(), Some(RecoveredError::record("load inbox", &e))),
    }
}

/// Drop repeats, keeping first-seen order
fn dedup(partners: Vec<ParticipantRef>) -> Vec<ParticipantRef> {
    let mut seen = std::collections::HashSet::new();
    partners
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
