//! Error kinds for the gateway core, matching the external-mapping table
//! 1:1 so the HTTP layer can translate without re-deriving policy.

use core::fmt;

/// A repository operation's failure. Deliberately narrow: the core
/// treats the repository as an oracle and never inspects adapter detail.
#[derive(Debug)]
pub enum RepoError {
    NotFound,
    InvalidInput(String),
    BackendFailure(String),
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::BackendFailure(msg) => write!(f, "backend failure: {msg}"),
        }
    }
}

impl std::error::Error for RepoError {}

/// The gateway's unified error kind, mapped to HTTP status by the server
/// crate per the table in the error-handling design.
#[derive(Debug)]
pub enum GatewayError {
    InvalidInput(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    CryptoFailure,
    BackendFailure,
    UpstreamTimeout,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound(kind) => write!(f, "{kind} not found"),
            Self::Conflict(msg) => write!(f, "{msg}"),
            Self::ServiceUnavailable(msg) => write!(f, "{msg}"),
            Self::CryptoFailure => write!(f, "crypto operation failed"),
            Self::BackendFailure => write!(f, "backend failure"),
            Self::UpstreamTimeout => write!(f, "upstream timeout"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<RepoError> for GatewayError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => GatewayError::NotFound("resource".into()),
            RepoError::InvalidInput(msg) => GatewayError::InvalidInput(msg),
            // The backend's own message is never surfaced to the caller.
            RepoError::BackendFailure(msg) => {
                tracing::warn!(error = %msg, "repository backend failure");
                GatewayError::BackendFailure
            }
        }
    }
}

impl From<sentinel_envelope::CryptoError> for GatewayError {
    fn from(_: sentinel_envelope::CryptoError) -> Self {
        GatewayError::CryptoFailure
    }
}
