//! Backend Access
//!
//! Single point of outbound HTTP configuration. All calls carry the session
//! cookie and go through [`Transport`].

mod client;
mod error;
mod transport;

pub use client::{ApiClient, SessionCheck};
pub use error::{ApiError, ApiResult, RecoveredError};
pub use transport::{ApiRequest, HttpTransport, Method, Transport, TransportConfig};

#[cfg(test)]
pub(crate) use transport::mock::MockTransport;
