//! Sources of the device position.

use async_trait::async_trait;
use shared::domain::Coordinate;

use crate::error::FeedError;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether precise location may be requested at all. When this is `false`
    /// the controller never calls [`LocationProvider::current_position`].
    fn is_secure_context(&self) -> bool;

    /// One-shot position reading.
    async fn current_position(&self) -> Result<Coordinate, FeedError>;
}

/// A secure context whose reading is known up front, e.g. from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocationProvider {
    position: Option<Coordinate>,
}

impl FixedLocationProvider {
    pub fn new(position: Option<Coordinate>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    fn is_secure_context(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinate, FeedError> {
        self.position.ok_or_else(|| {
            FeedError::LocationUnavailable("no position configured for this device".into())
        })
    }
}

/// A context without permission for precise location.
#[derive(Debug, Clone, Copy, Default)]
pub struct InsecureContext;

#[async_trait]
impl LocationProvider for InsecureContext {
    fn is_secure_context(&self) -> bool {
        false
    }

    async fn current_position(&self) -> Result<Coordinate, FeedError> {
        Err(FeedError::LocationUnavailable(
            "precise location is not permitted in an insecure context".into(),
        ))
    }
}
