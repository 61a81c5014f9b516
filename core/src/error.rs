use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the library. Per-unit failures (`Io`, `Fetch`,
/// `InvalidInput`) are logged and skipped by callers; the lock protocol
/// violations (`IllegalState`, `WrongOwner`) indicate a caller bug.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("json emission failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    #[error("write lock released by a thread that does not own it")]
    WrongOwner,
}
