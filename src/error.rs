use thiserror::Error;

use crate::models::ModelTarget;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("A comparison is already in progress")]
    Busy,

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Request to {target} model failed: {source}")]
    Request {
        target: ModelTarget,
        #[source]
        source: reqwest::Error,
    },

    #[error("{target} model returned {status}: {message}")]
    Status {
        target: ModelTarget,
        status: u16,
        message: String,
    },

    #[error("Could not decode {target} model response: {message}")]
    Decode { target: ModelTarget, message: String },

    #[error("Backend is unhealthy: {0}")]
    Unhealthy(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompareError {
    pub fn decode(target: ModelTarget, message: impl Into<String>) -> Self {
        CompareError::Decode {
            target,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
