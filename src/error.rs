use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("directory lookup failed: {0}")]
    Directory(String),
    #[error("calendar error: {0}")]
    Calendar(String),
    #[error("ticket graph error: {0}")]
    Graph(String),
    #[error("issue tracker error: {0}")]
    IssueTracker(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
