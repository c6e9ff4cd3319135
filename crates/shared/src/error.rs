use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidArgument,
    Config,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("invalid command encoding '{bits}': {reason}")]
    InvalidEncoding { bits: String, reason: String },
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

impl ControlError {
    pub fn invalid_encoding(bits: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            bits: bits.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownCommand(_) | Self::InvalidEncoding { .. } => ErrorCode::InvalidArgument,
            Self::InvalidEndpoint(_) | Self::Config(_) => ErrorCode::Config,
            Self::Runtime(_) => ErrorCode::Internal,
        }
    }
}
