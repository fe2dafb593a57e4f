use thiserror::Error;

/// Errors raised by the trip content pipeline
#[derive(Error, Debug)]
pub enum VoyaError {
    /// No credential configured for the named endpoint
    #[error("{0} API key is not configured")]
    MissingCredential(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VoyaError {
    /// Missing-credential failures leave category data untouched instead of
    /// substituting the fallback set.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential(_) | Self::Config(_))
    }
}

impl From<reqwest::Error> for VoyaError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Upstream {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, VoyaError>;
