use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
    #[error("{operation} failed: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl FeedError {
    pub fn network(operation: &'static str, source: impl Display) -> Self {
        Self::Network {
            operation,
            message: source.to_string(),
        }
    }
}
