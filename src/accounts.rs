//! Account Lifecycle
//!
//! Registration, profile edits and account deletion. Input is validated
//! before any request; backend failures become toasts.

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::model::{ParticipantRef, PartnerKind, Registration, TherapistProfile, UserProfile};
use crate::notify::Notifications;
use crate::session::SessionStore;
use crate::validation::{validate_registration, ValidationError};

#[derive(Error, Debug)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Create an account of `kind`, returning a reference to it
pub async fn register(
    api: &ApiClient,
    kind: PartnerKind,
    form: &Registration,
    toasts: &mut Notifications,
) -> Result<ParticipantRef, AccountError> {
    validate_registration(form)?;

    let result = match kind {
        PartnerKind::User => api.register_user(form).await.map(|u| u.id),
        PartnerKind::Therapist => api.register_therapist(form).await.map(|t| t.id),
    };

    match result {
        Ok(id) => {
            tracing::info!(kind = %kind, id = %id, "Account registered");
            toasts.success("Account created");
            Ok(ParticipantRef::new(id, kind))
        }
        Err(e) => {
            toasts.api_error("register", &e);
            Err(e.into())
        }
    }
}

pub async fn save_user_profile(
    api: &ApiClient,
    profile: &UserProfile,
    toasts: &mut Notifications,
) -> Result<UserProfile, AccountError> {
    match api.update_user(profile).await {
        Ok(saved) => {
            toasts.success("Profile saved");
            Ok(saved)
        }
        Err(e) => {
            toasts.api_error("save profile", &e);
            Err(e.into())
        }
    }
}

pub async fn save_therapist_profile(
    api: &ApiClient,
    profile: &TherapistProfile,
    toasts: &mut Notifications,
) -> Result<TherapistProfile, AccountError> {
    match api.update_therapist(profile).await {
        Ok(saved) => {
            toasts.success("Profile saved");
            Ok(saved)
        }
        Err(e) => {
            toasts.api_error("save profile", &e);
            Err(e.into())
        }
    }
}

/// Delete the account and drop its session
pub async fn delete_account(
    api: &ApiClient,
    session: &SessionStore,
    account: &ParticipantRef,
    toasts: &mut Notifications,
) -> Result<(), AccountError> {
    match api.delete_account(account).await {
        Ok(()) => {
            session.clear_role(account.kind).await;
            toasts.info("Your account has been deleted");
            Ok(())
        }
        Err(e) => {
            toasts.api_error("delete account", &e);
            Err(e.into())
        }
    }
}
