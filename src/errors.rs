//! Crate-wide error type. Mirrors the reference actor framework's single `thiserror`-derived
//! enum that unifies mailbox, timeout, queue and sink failures behind one `Result` alias.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SensorPipelineError>;

#[derive(Error, Debug)]
pub enum SensorPipelineError {
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("actor mailbox closed")]
    MailboxClosed,

    #[error("actor mailbox full")]
    MailboxFull,

    #[error("streaming queue closed")]
    QueueClosed,

    #[error("streaming queue already running")]
    AlreadyRunning,

    #[error("worker pool task failed: {0}")]
    PoolTaskFailed(String),

    #[error("sink io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
