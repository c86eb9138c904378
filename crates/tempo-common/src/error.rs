use thiserror::Error;

/// Failures raised while sending a request, either directly or through a page.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("No active tab available")]
    NoActiveTab,

    #[error("Page execution failed: {0}")]
    Page(String),

    #[error("Dispatch task failed: {0}")]
    Task(String),
}

/// Failures surfaced by the service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The captured request is absent or has no body. Nothing was sent.
    #[error("{0}")]
    MissingTemplate(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The requested duration cannot be reported as given.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Unable to detect the active product")]
    UnknownProduct,
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::MalformedPayload(err.to_string())
    }
}
