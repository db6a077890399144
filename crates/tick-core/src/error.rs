use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::task::TaskId;

/// Why a load fell back to an empty store.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {status} ({url})")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("document has no `tasks` field")]
    MissingTasks,

    #[error("`tasks` field is not a list")]
    InvalidTasks,
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task text is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no task with id {id}")]
pub struct NotFoundError {
    pub id: TaskId,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no completed tasks to clear")]
pub struct NoOpError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("unknown or already used confirmation token {0}")]
    UnknownToken(Uuid),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    NoOp(#[from] NoOpError),
}
