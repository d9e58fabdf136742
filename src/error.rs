use thiserror::Error;

/// Application-wide error type.
///
/// Every variant is `Clone` so results can travel inside UI messages.
/// Source errors that are not cloneable (reqwest, io) are flattened to
/// their display strings at the boundary where they occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A required environment variable is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The auth provider rejected the credentials or the signup request.
    #[error("{0}")]
    Auth(String),

    /// A request reached the API without a usable token, or the API
    /// answered 401. Resolved by returning to the sign-in screen.
    #[error("session expired")]
    Unauthorized,

    /// 404 on a read. Callers decide whether this is an empty state
    /// (gallery page 1, profile) or a real problem.
    #[error("not found")]
    NotFound,

    /// Any other non-2xx API answer.
    #[error("request failed ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Input rejected before any network call was made.
    #[error("{0}")]
    Validation(String),

    /// Local disk problems (session file, selected upload files).
    #[error("storage error: {0}")]
    Storage(String),

    /// JSON encode/decode failure outside an HTTP response body.
    #[error("serialization error: {0}")]
    Json(String),

    /// A selected file could not be decoded as an image.
    #[error("image error: {0}")]
    Image(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
