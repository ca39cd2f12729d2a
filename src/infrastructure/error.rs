use crate::domain::forms::FormError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Validation(String),
    #[error("not signed in")]
    Unauthenticated,
    #[error("auth error: {0}")]
    Auth(String),
    #[error("backend error: http {status}: {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid {table} record: {reason}")]
    InvalidRecord { table: String, reason: String },
    #[error("credential store error: {0}")]
    Credential(String),
    #[error("geocoding error: {0}")]
    Geocoding(String),
}

impl From<FormError> for InfraError {
    fn from(error: FormError) -> Self {
        Self::Validation(error.0)
    }
}

impl InfraError {
    /// Message suitable for a transient notice in the UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Auth(message) => message.clone(),
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
