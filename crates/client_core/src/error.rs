use shared::domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request {method} {path} failed: {source}")]
    Request {
        method: &'static str,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server rejected {method} {path} ({status}): {detail}")]
    Rejected {
        method: &'static str,
        path: String,
        status: u16,
        detail: String,
    },
    #[error("invalid server base address '{address}': {reason}")]
    InvalidBaseUrl { address: String, reason: String },
}

impl ClientError {
    /// Message the service attached to a rejection, if the request got that far.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            Self::Rejected { detail, .. } => Some(detail),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected { status: 404, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("live session is not connected")]
    NotConnected,
    #[error("invalid rover command: {0}")]
    InvalidCommand(#[from] DomainError),
    #[error("failed to open live session: {0}")]
    Connect(String),
}
