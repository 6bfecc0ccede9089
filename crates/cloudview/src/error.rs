//! Error types for the viewer core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("point cloud payload is empty")]
    EmptyPayload,

    #[error("none of the {submitted} submitted points had finite coordinates")]
    NoValidPoints { submitted: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown camera command: {0}")]
    UnknownCommand(String),
}

pub type Result<T> = std::result::Result<T, Error>;
