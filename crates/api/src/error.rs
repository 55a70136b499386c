use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode JSON response from RT REST2 API: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Unexpected response from RT API: {0}")]
    Protocol(String),

    #[error("JSON serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Missing configuration value: {0}")]
    MissingConfig(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Decode,
    Protocol,
    Setup,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Decode(_) => ErrorKind::Decode,
            ApiError::Protocol(_) => ErrorKind::Protocol,
            ApiError::Serialize(_)
            | ApiError::InvalidUrl(_)
            | ApiError::InvalidHeader(_)
            | ApiError::MissingConfig(_)
            | ApiError::Config(_) => ErrorKind::Setup,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ApiError::Decode(_) => {
                Some("The server did not return JSON; check the ticket ID and your token")
            }
            ApiError::MissingConfig(_) | ApiError::Config(_) => {
                Some("Set base_url and token in ~/.rt-rest2/config.yaml")
            }
            ApiError::InvalidHeader(_) => Some("Check the token for stray whitespace or newlines"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
