//! # error: failure taxonomy shared by the transport, contracts and controllers
//!
//! Every fallible operation in the core returns [`Result`]. Variants carry
//! enough structure (status, body, identity) for the caller to render a precise
//! diagnostic; the core itself never retries.

use crate::remote::IntegrationId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network, TLS or timeout failure before a status code was received.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// The caller withdrew while waiting for a slot or while the request was in flight.
    #[error("operation cancelled")]
    Cancelled,

    /// The remote service answered 404.
    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    /// The instance disappeared remotely between a read and an update.
    #[error("integration {id} no longer exists remotely and cannot be updated")]
    UpdateTargetMissing { id: IntegrationId },

    /// Any non-2xx, non-404 answer. The body is kept verbatim.
    #[error("remote service returned status {status}: {body}")]
    RemoteFailure { status: u16, body: String },

    /// Malformed caller input, detected before any network call.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// A success response that does not describe an integration.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("expected integration kind `{expected}`, remote service reports `{found}`")]
    KindMismatch { expected: String, found: String },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::UpdateTargetMissing { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
