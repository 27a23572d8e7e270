use thiserror::Error;

pub type Result<T> = std::result::Result<T, RoostError>;

#[derive(Debug, Error)]
pub enum RoostError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl RoostError {
    /// Map an HTTP status to the variant callers branch on. 404 and 403
    /// carry protocol meaning (missing resource, refused follow) and get
    /// their own variants; everything else is a plain API failure.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => RoostError::NotFound(message),
            403 => RoostError::Forbidden(message),
            _ => RoostError::Api { status, message },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RoostError::NotFound(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, RoostError::Forbidden(_))
    }
}

impl From<reqwest::Error> for RoostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RoostError::Parse(err.to_string())
        } else {
            RoostError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RoostError {
    fn from(err: serde_json::Error) -> Self {
        RoostError::Parse(err.to_string())
    }
}
