use thiserror::Error;
use tokio::io;
use tokio_tungstenite::tungstenite;

pub type ClientResult<T> = core::result::Result<T, ClientError>;

/// Failure of a single call to the task service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{operation} failed: HTTP {status}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} failed: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("{operation} returned an unreadable body: {message}")]
    Body {
        operation: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub fn operation(&self) -> &'static str {
        match self {
            RemoteError::Status { operation, .. }
            | RemoteError::Transport { operation, .. }
            | RemoteError::Body { operation, .. } => operation,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A push-channel payload that could not be turned into a task.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed task payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed frame: {0}")]
    Frame(String),
    #[error("unexpected binary message ({0} bytes)")]
    Binary(usize),
}

/// The push channel could not be established.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("broker rejected the connection: {0}")]
    Rejected(String),
    #[error("connection closed before the handshake completed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Remote(#[from] RemoteError),
    #[error("{0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Connection(#[from] ConnectionError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("task {0} is not on the board")]
    UnknownTask(i64),
    #[error("{0}")]
    IoError(#[from] io::Error),
    #[error("{0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("{0}")]
    PromptError(#[from] dialoguer::Error),
    #[error("{0}")]
    Other(String),
}
