use reqwest::StatusCode;
use std::borrow::Cow;

/// Error surfaced to UI callers of the chat façade. Always carries a message
/// that can be displayed as-is.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Unauthorized: {0}")]
    Unauthorized(Cow<'static, str>),
    #[error("Forbidden: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Conflict: {0}")]
    Conflict(Cow<'static, str>),
    #[error("{0}")]
    Unavailable(Cow<'static, str>),
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Error::BadRequest(msg)
            | Error::Unauthorized(msg)
            | Error::Forbidden(msg)
            | Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Unavailable(msg) => msg,
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match *self {
            Error::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            Error::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            Error::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            Error::NotFound(_) => Some(StatusCode::NOT_FOUND),
            Error::Conflict(_) => Some(StatusCode::CONFLICT),
            Error::Unavailable(_) => None,
        }
    }

    /// Maps an internal failure to a UI rejection. Client errors keep the
    /// server's message; everything else is reported as `context`.
    pub fn from_system(err: SystemError, context: &'static str) -> Self {
        match err {
            SystemError::Status { status, message } => match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    Error::BadRequest(message)
                }
                StatusCode::UNAUTHORIZED => Error::Unauthorized(message),
                StatusCode::FORBIDDEN => Error::Forbidden(message),
                StatusCode::NOT_FOUND => Error::NotFound(message),
                StatusCode::CONFLICT => Error::Conflict(message),
                _ => {
                    tracing::error!("{context}: server responded {status}: {message}");
                    Error::Unavailable(context.into())
                }
            },
            SystemError::BadRequest(msg) => Error::BadRequest(msg),
            SystemError::ValidationError(errors) => Error::BadRequest(errors.to_string().into()),
            other => {
                tracing::error!("{context}: {other:?}");
                Error::Unavailable(context.into())
            }
        }
    }
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        Error::from_system(value, "Chat service unavailable")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    // reqwest errors
    #[error("HTTP Error: {0}")]
    HttpError(#[from] reqwest::Error),
    // serde errors
    #[error("JSON Serialization/Deserialization Error")]
    JsonError(#[from] serde_json::Error),
    // websocket errors
    #[error("WebSocket Error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),
    // io errors
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    // validator errors
    #[error("Validation Error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
    // actor errors
    #[error("Actor mailbox error: {0}")]
    MailboxError(#[from] actix::MailboxError),
    // non-2xx responses
    #[error("Unexpected status {status}: {message}")]
    Status { status: StatusCode, message: Cow<'static, str> },
    // Custom Errors
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
}

impl SystemError {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(status: StatusCode, msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Status { status, message: msg.into() }
    }
}

/// Why a private channel could not be subscribed. Only used for diagnostics;
/// the bridge never retries on its own.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("channel authorization rejected the access token (401)")]
    Unauthenticated,
    #[error("not a participant of this channel (403)")]
    Forbidden,
    #[error("malformed channel name (400)")]
    Malformed,
    #[error("channel authorization backend fault ({0})")]
    Backend(u16),
    #[error("channel authorization failed: {0}")]
    Transport(String),
}

impl SubscriptionError {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthenticated,
            403 => Self::Forbidden,
            400 => Self::Malformed,
            s if s >= 500 => Self::Backend(s),
            s => Self::Transport(format!("unexpected status {s}")),
        }
    }

    /// 403 holds for the rest of the session.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Forbidden)
    }

    pub fn guidance(&self) -> &'static str {
        match self {
            Self::Unauthenticated => {
                "access token is missing or expired; refresh the session and connect again"
            }
            Self::Forbidden => "the current user does not participate in this conversation",
            Self::Malformed => "channel name was rejected by the authorization endpoint",
            Self::Backend(_) => "authorization endpoint failed; subscribe again to retry",
            Self::Transport(_) => "authorization endpoint unreachable; subscribe again to retry",
        }
    }
}
