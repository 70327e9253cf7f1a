use thiserror::Error;

/// Failure reported by a `RemoteClient`
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request failed: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Unauthorized, check the api token")]
    Unauthorized,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A line or id resolved to no node
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structural misuse, the operation was rejected
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invariant breach, never expected under correct usage
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),
}

impl TreeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_))
    }
}
