use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::DomainError, geo};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

id_newtype!(PostId);

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(DomainError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Values that bypassed [`Coordinate::new`] (e.g. deserialized ones) must be
    /// checked with this before use.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        geo::distance_km(*self, *other)
    }
}

/// A short-lived message pinned to a location.
///
/// Only `content` and `location` are guaranteed on the read path; the
/// remaining fields are assigned by the feed service and default when a
/// response omits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PostId>,
    pub content: String,
    pub location: Coordinate,
    /// Requested time-to-live in seconds.
    #[serde(default)]
    pub duration: i64,
    /// Unix timestamp (seconds) at which the service accepted the post.
    #[serde(default)]
    pub created_at: i64,
}

impl Post {
    pub fn expires_at(&self) -> i64 {
        self.created_at.saturating_add(self.duration)
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at() <= now
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
