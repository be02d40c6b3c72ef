//! Client side of the radius feed: HTTP access to the feed service and the
//! per-session controller that sequences location, fetch, and post.

pub mod controller;
pub mod error;
pub mod feed_client;
pub mod location;

pub use controller::{
    ControllerPhase, FeedEntry, FeedEvent, FeedSettings, FeedState, LocationFeedController,
    PostOutcome,
};
pub use error::FeedError;
pub use feed_client::{FeedApi, FeedClient, FeedClientConfig};
pub use location::{FixedLocationProvider, InsecureContext, LocationProvider};
