use std::fmt;

use crate::models::EventId;

/// Failure of a remote call. Always logged and swallowed by the sync layer.
#[derive(Debug)]
pub enum RemoteError {
    Transport(reqwest::Error),
    Status { status: u16, message: String },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::Transport(err) => write!(f, "Transport error: {}", err),
            RemoteError::Status { status, message } => {
                write!(f, "Remote returned {}: {}", status, message)
            }
        }
    }
}

impl std::error::Error for RemoteError {}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err)
    }
}

/// Local failure of a store operation; these do reach the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    UnknownEvent(EventId),
    UnknownDiscussion(i64),
    EmptyContent,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::UnknownEvent(id) => write!(f, "Unknown event: {}", id),
            SyncError::UnknownDiscussion(id) => write!(f, "Unknown discussion: {}", id),
            SyncError::EmptyContent => write!(f, "Content cannot be empty"),
        }
    }
}

impl std::error::Error for SyncError {}

pub type SyncResult<T> = Result<T, SyncError>;
