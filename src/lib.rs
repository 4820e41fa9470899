pub mod config;
pub mod core;
pub mod engine;
pub mod feed;
pub mod parse;
pub mod storage;

pub mod export_cmd;
pub mod list_cmd;
pub mod refresh_cmd;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("{0}")]
    Message(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
