//! Session orchestration: acquire a position, load the nearby feed, post, refresh.
//!
//! The controller owns all session state and every operation takes `&mut self`,
//! so at most one network call is ever in flight for a session.

use std::{fmt, sync::Arc};

use shared::{
    domain::{Coordinate, Post},
    geo,
    protocol::{DEFAULT_POST_TTL_SECONDS, DEFAULT_RADIUS_KM},
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{error::FeedError, feed_client::FeedApi, location::LocationProvider};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Uninitialized,
    LocatingDevice,
    Ready,
    Posting,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    /// Set at most once per session.
    pub current_location: Option<Coordinate>,
    pub draft_message: String,
    /// Replaced wholesale on every successful fetch, in server order.
    pub visible_posts: Vec<Post>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSettings {
    pub radius_km: f64,
    pub post_ttl_seconds: i64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            post_ttl_seconds: DEFAULT_POST_TTL_SECONDS,
        }
    }
}

/// One rendered line of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub distance_km: f64,
    pub content: String,
}

impl fmt::Display for FeedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} km away: {}",
            geo::round_km(self.distance_km),
            self.content
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    EmptyDraft,
    LocationUnknown,
    SubmitFailed,
    Published { refreshed: bool },
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    LocationResolved(Coordinate),
    FeedRefreshed { post_count: usize },
    PostPublished(Post),
    Error(String),
}

pub struct LocationFeedController {
    feed: Arc<dyn FeedApi>,
    location: Arc<dyn LocationProvider>,
    settings: FeedSettings,
    state: FeedState,
    phase: ControllerPhase,
    events: broadcast::Sender<FeedEvent>,
}

impl LocationFeedController {
    pub fn new(feed: Arc<dyn FeedApi>, location: Arc<dyn LocationProvider>) -> Self {
        Self::with_settings(feed, location, FeedSettings::default())
    }

    pub fn with_settings(
        feed: Arc<dyn FeedApi>,
        location: Arc<dyn LocationProvider>,
        settings: FeedSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            feed,
            location,
            settings,
            state: FeedState::default(),
            phase: ControllerPhase::Uninitialized,
            events,
        }
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn settings(&self) -> FeedSettings {
        self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// Resolves the session location and loads the first page of the feed.
    ///
    /// An insecure context falls back to `(0, 0)` without asking the provider.
    /// A failed reading in a secure context leaves the location unknown and
    /// skips the fetch; there is no retry.
    pub async fn initialize(&mut self) {
        if self.phase != ControllerPhase::Uninitialized {
            warn!(phase = ?self.phase, "controller already initialized; ignoring");
            return;
        }

        let resolved = if self.location.is_secure_context() {
            self.phase = ControllerPhase::LocatingDevice;
            match self.location.current_position().await {
                Ok(position) => Some(position),
                Err(err) => {
                    error!(error = %err, "failed to acquire device location");
                    self.emit_error(&err);
                    None
                }
            }
        } else {
            info!("insecure context, using position (0, 0)");
            Some(Coordinate::ORIGIN)
        };
        self.phase = ControllerPhase::Ready;

        if let Some(position) = resolved {
            info!(
                latitude = position.latitude,
                longitude = position.longitude,
                "session location resolved"
            );
            self.state.current_location = Some(position);
            let _ = self.events.send(FeedEvent::LocationResolved(position));
            self.refresh().await;
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.state.draft_message = text.into();
    }

    /// Submits the draft, then reloads the feed around the session location.
    ///
    /// The draft and the visible feed are left untouched by any failure.
    pub async fn post(&mut self) -> PostOutcome {
        if self.state.draft_message.is_empty() {
            debug!("empty draft; nothing to post");
            return PostOutcome::EmptyDraft;
        }
        let Some(location) = self.state.current_location else {
            warn!("cannot post before the session location is known");
            return PostOutcome::LocationUnknown;
        };

        self.phase = ControllerPhase::Posting;
        let submitted = self
            .feed
            .submit_post(
                location,
                &self.state.draft_message,
                self.settings.post_ttl_seconds,
            )
            .await;

        let outcome = match submitted {
            Ok(post) => {
                info!(post_id = ?post.id, "post published");
                let _ = self.events.send(FeedEvent::PostPublished(post));
                let refreshed = self.refresh().await;
                PostOutcome::Published { refreshed }
            }
            Err(err) => {
                error!(error = %err, "failed to submit post");
                self.emit_error(&err);
                PostOutcome::SubmitFailed
            }
        };
        self.phase = ControllerPhase::Ready;
        outcome
    }

    /// Reloads the feed. Returns `false` and keeps the previous posts when the
    /// location is unknown or the fetch fails.
    pub async fn refresh(&mut self) -> bool {
        let Some(center) = self.state.current_location else {
            warn!("cannot refresh before the session location is known");
            return false;
        };

        match self.feed.fetch_nearby(self.settings.radius_km, center).await {
            Ok(posts) => {
                let post_count = posts.len();
                debug!(post_count, "feed refreshed");
                self.state.visible_posts = posts;
                let _ = self.events.send(FeedEvent::FeedRefreshed { post_count });
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to refresh nearby posts");
                self.emit_error(&err);
                false
            }
        }
    }

    /// Distance-annotated view of the visible posts, computed fresh each call.
    pub fn render(&self) -> Vec<FeedEntry> {
        let Some(origin) = self.state.current_location else {
            return Vec::new();
        };
        self.state
            .visible_posts
            .iter()
            .map(|post| FeedEntry {
                distance_km: origin.distance_to(&post.location),
                content: post.content.clone(),
            })
            .collect()
    }

    fn emit_error(&self, err: &FeedError) {
        let _ = self.events.send(FeedEvent::Error(err.to_string()));
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
