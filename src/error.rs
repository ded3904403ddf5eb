use thiserror::Error;

/// Failure talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}{}", detail_suffix(.detail))]
    Http { status: u16, detail: Option<String> },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Client-side checks that block a submission before it reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Phone number is required")]
    PhoneRequired,
    #[error("Please enter a valid phone number")]
    InvalidPhone,
    #[error("Input is too short (at least {min} characters).")]
    TooShort { min: usize },
    #[error("Tokens are limited. Please shorten your message (at most {max} characters).")]
    TooLong { max: usize },
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to {verb} contact: {source}")]
    Failed {
        verb: &'static str,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to send message: {source}")]
    Failed {
        /// Content that did not reach the assistant.
        unsent: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("session payload: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("no data directory available")]
    NoDataDir,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
