use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("document rendering failed: {0}")]
    Render(#[from] genpdf::error::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no warning is awaiting confirmation")]
    NoPendingConfirmation,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// The showroom endpoint rejects a second open visit with this message.
    #[must_use]
    pub fn is_already_checked_in(&self) -> bool {
        match self {
            Self::Api { message, .. } => message.to_ascii_lowercase().contains("already checked in"),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
