use super::*;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::location::{FixedLocationProvider, InsecureContext};

#[derive(Debug, Clone, PartialEq)]
enum FeedCall {
    Submit {
        location: Coordinate,
        content: String,
        ttl_seconds: i64,
    },
    Fetch {
        radius_km: f64,
        center: Coordinate,
    },
}

/// Records every call and replays queued results; an empty queue succeeds.
#[derive(Default)]
struct RecordingFeed {
    calls: Mutex<Vec<FeedCall>>,
    submit_results: Mutex<VecDeque<Result<Post, FeedError>>>,
    fetch_results: Mutex<VecDeque<Result<Vec<Post>, FeedError>>>,
}

impl RecordingFeed {
    fn calls(&self) -> Vec<FeedCall> {
        self.calls.lock().expect("calls").clone()
    }

    fn queue_submit(&self, result: Result<Post, FeedError>) {
        self.submit_results
            .lock()
            .expect("submit results")
            .push_back(result);
    }

    fn queue_fetch(&self, result: Result<Vec<Post>, FeedError>) {
        self.fetch_results
            .lock()
            .expect("fetch results")
            .push_back(result);
    }
}

#[async_trait]
impl FeedApi for RecordingFeed {
    async fn submit_post(
        &self,
        location: Coordinate,
        content: &str,
        ttl_seconds: i64,
    ) -> Result<Post, FeedError> {
        self.calls.lock().expect("calls").push(FeedCall::Submit {
            location,
            content: content.to_string(),
            ttl_seconds,
        });
        let queued = self.submit_results.lock().expect("submit results").pop_front();
        queued.unwrap_or_else(|| Ok(post(content, location.latitude, location.longitude)))
    }

    async fn fetch_nearby(
        &self,
        radius_km: f64,
        center: Coordinate,
    ) -> Result<Vec<Post>, FeedError> {
        self.calls
            .lock()
            .expect("calls")
            .push(FeedCall::Fetch { radius_km, center });
        let queued = self.fetch_results.lock().expect("fetch results").pop_front();
        queued.unwrap_or_else(|| Ok(Vec::new()))
    }
}

struct ScriptedLocation {
    secure: bool,
    reading: Mutex<Option<Result<Coordinate, FeedError>>>,
    requests: AtomicUsize,
}

impl ScriptedLocation {
    fn insecure() -> Self {
        Self {
            secure: false,
            reading: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    fn secure(reading: Result<Coordinate, FeedError>) -> Self {
        Self {
            secure: true,
            reading: Mutex::new(Some(reading)),
            requests: AtomicUsize::new(0),
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocation {
    fn is_secure_context(&self) -> bool {
        self.secure
    }

    async fn current_position(&self) -> Result<Coordinate, FeedError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.reading
            .lock()
            .expect("reading")
            .take()
            .unwrap_or_else(|| Err(FeedError::LocationUnavailable("already read".into())))
    }
}

fn post(content: &str, latitude: f64, longitude: f64) -> Post {
    Post {
        id: None,
        content: content.to_string(),
        location: Coordinate {
            latitude,
            longitude,
        },
        duration: 30,
        created_at: 0,
    }
}

fn network_error(operation: &'static str) -> FeedError {
    FeedError::network(operation, "connection reset")
}

fn london() -> Coordinate {
    Coordinate::new(51.5074, -0.1278).expect("london")
}

fn controller(
    feed: &Arc<RecordingFeed>,
    location: &Arc<ScriptedLocation>,
) -> LocationFeedController {
    LocationFeedController::new(feed.clone(), location.clone())
}

#[tokio::test]
async fn insecure_context_falls_back_to_origin_without_platform_call() {
    let feed = Arc::new(RecordingFeed::default());
    let location = Arc::new(ScriptedLocation::insecure());
    let mut controller = controller(&feed, &location);
    assert_eq!(controller.phase(), ControllerPhase::Uninitialized);

    controller.initialize().await;

    assert_eq!(location.requests(), 0);
    assert_eq!(controller.state().current_location, Some(Coordinate::ORIGIN));
    assert_eq!(
        feed.calls(),
        [FeedCall::Fetch {
            radius_km: 5.0,
            center: Coordinate::ORIGIN,
        }]
    );
    assert_eq!(controller.phase(), ControllerPhase::Ready);
}

#[tokio::test]
async fn secure_context_uses_device_position_for_initial_fetch() {
    let feed = Arc::new(RecordingFeed::default());
    feed.queue_fetch(Ok(vec![post("nearby", 51.51, -0.12)]));
    let location = Arc::new(ScriptedLocation::secure(Ok(london())));
    let mut controller = controller(&feed, &location);

    controller.initialize().await;

    assert_eq!(location.requests(), 1);
    assert_eq!(controller.state().current_location, Some(london()));
    assert_eq!(
        feed.calls(),
        [FeedCall::Fetch {
            radius_km: 5.0,
            center: london(),
        }]
    );
    assert_eq!(controller.state().visible_posts, vec![post("nearby", 51.51, -0.12)]);
}

#[tokio::test]
async fn location_failure_leaves_location_unknown_and_skips_fetch() {
    let feed = Arc::new(RecordingFeed::default());
    let location = Arc::new(ScriptedLocation::secure(Err(FeedError::LocationUnavailable(
        "permission denied".into(),
    ))));
    let mut controller = controller(&feed, &location);
    let mut events = controller.subscribe_events();

    controller.initialize().await;

    assert_eq!(controller.state().current_location, None);
    assert!(feed.calls().is_empty());
    assert!(matches!(events.try_recv(), Ok(FeedEvent::Error(message)) if message.contains("permission denied")));

    controller.set_draft("hello");
    assert_eq!(controller.post().await, PostOutcome::LocationUnknown);
    assert!(!controller.refresh().await);
    assert!(feed.calls().is_empty());
    assert!(controller.render().is_empty());
}

#[tokio::test]
async fn initialize_runs_only_once_per_session() {
    let feed = Arc::new(RecordingFeed::default());
    let location = Arc::new(ScriptedLocation::secure(Ok(london())));
    let mut controller = controller(&feed, &location);

    controller.initialize().await;
    controller.initialize().await;

    assert_eq!(location.requests(), 1);
    assert_eq!(feed.calls().len(), 1);
    assert_eq!(controller.state().current_location, Some(london()));
}

#[tokio::test]
async fn empty_draft_makes_no_network_calls() {
    let feed = Arc::new(RecordingFeed::default());
    let location = Arc::new(ScriptedLocation::insecure());
    let mut controller = controller(&feed, &location);
    controller.initialize().await;
    let calls_after_init = feed.calls().len();

    controller.set_draft("");
    assert_eq!(controller.post().await, PostOutcome::EmptyDraft);
    assert_eq!(feed.calls().len(), calls_after_init);
}

#[tokio::test]
async fn successful_post_is_followed_by_exactly_one_refresh() {
    let feed = Arc::new(RecordingFeed::default());
    let location = Arc::new(ScriptedLocation::secure(Ok(london())));
    let mut controller = controller(&feed, &location);
    controller.initialize().await;

    feed.queue_fetch(Ok(vec![post("hello", 51.5074, -0.1278), post("older", 51.52, -0.13)]));
    controller.set_draft("hello");
    let mut events = controller.subscribe_events();
    let outcome = controller.post().await;

    assert_eq!(outcome, PostOutcome::Published { refreshed: true });
    assert_eq!(
        feed.calls()[1..],
        [
            FeedCall::Submit {
                location: london(),
                content: "hello".into(),
                ttl_seconds: 30,
            },
            FeedCall::Fetch {
                radius_km: 5.0,
                center: london(),
            },
        ]
    );
    let contents: Vec<&str> = controller
        .state()
        .visible_posts
        .iter()
        .map(|p| p.content.as_str())
        .collect();
    assert_eq!(contents, ["hello", "older"]);
    assert_eq!(controller.state().draft_message, "hello");
    assert_eq!(controller.phase(), ControllerPhase::Ready);
    assert!(matches!(events.try_recv(), Ok(FeedEvent::PostPublished(_))));
    assert!(matches!(
        events.try_recv(),
        Ok(FeedEvent::FeedRefreshed { post_count: 2 })
    ));
}

#[tokio::test]
async fn failed_post_skips_refresh_and_keeps_state() {
    let feed = Arc::new(RecordingFeed::default());
    feed.queue_fetch(Ok(vec![post("existing", 0.01, 0.0)]));
    let location = Arc::new(ScriptedLocation::insecure());
    let mut controller = controller(&feed, &location);
    controller.initialize().await;
    let before = controller.state().clone();

    feed.queue_submit(Err(network_error("submit_post")));
    controller.set_draft("will fail");
    let outcome = controller.post().await;

    assert_eq!(outcome, PostOutcome::SubmitFailed);
    let calls = feed.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[1], FeedCall::Submit { .. }));
    assert_eq!(controller.state().visible_posts, before.visible_posts);
    assert_eq!(controller.state().draft_message, "will fail");
    assert_eq!(controller.phase(), ControllerPhase::Ready);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_posts() {
    let feed = Arc::new(RecordingFeed::default());
    feed.queue_fetch(Ok(vec![post("kept", 0.0, 0.01)]));
    let location = Arc::new(ScriptedLocation::insecure());
    let mut controller = controller(&feed, &location);
    controller.initialize().await;

    feed.queue_fetch(Err(network_error("fetch_nearby")));
    controller.set_draft("posted");
    let outcome = controller.post().await;

    assert_eq!(outcome, PostOutcome::Published { refreshed: false });
    assert_eq!(controller.state().visible_posts, vec![post("kept", 0.0, 0.01)]);

    feed.queue_fetch(Err(network_error("fetch_nearby")));
    assert!(!controller.refresh().await);
    assert_eq!(controller.state().visible_posts, vec![post("kept", 0.0, 0.01)]);
}

#[tokio::test]
async fn successful_fetch_replaces_posts_wholesale() {
    let feed = Arc::new(RecordingFeed::default());
    feed.queue_fetch(Ok(vec![post("a", 0.0, 0.0), post("b", 0.0, 0.0)]));
    let location = Arc::new(ScriptedLocation::insecure());
    let mut controller = controller(&feed, &location);
    controller.initialize().await;

    feed.queue_fetch(Ok(vec![post("c", 0.0, 0.0)]));
    assert!(controller.refresh().await);
    assert_eq!(controller.state().visible_posts, vec![post("c", 0.0, 0.0)]);
}

#[tokio::test]
async fn render_annotates_posts_with_distance_from_session_location() {
    let feed = Arc::new(RecordingFeed::default());
    feed.queue_fetch(Ok(vec![
        post("paris", 48.8566, 2.3522),
        post("here", 51.5074, -0.1278),
    ]));
    let location = Arc::new(ScriptedLocation::secure(Ok(london())));
    let mut controller = controller(&feed, &location);
    controller.initialize().await;

    let entries = controller.render();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content, "paris");
    assert!(entries[0].distance_km > 343.0 && entries[0].distance_km < 344.0);
    assert_eq!(entries[1].distance_km, 0.0);
    assert_eq!(entries[1].to_string(), "0.00 km away: here");
    assert!(entries[0].to_string().ends_with(" km away: paris"));
    assert_eq!(controller.render(), entries);
}

#[tokio::test]
async fn custom_settings_drive_radius_and_ttl() {
    let feed = Arc::new(RecordingFeed::default());
    let location = Arc::new(ScriptedLocation::insecure());
    let mut controller = LocationFeedController::with_settings(
        feed.clone(),
        location.clone(),
        FeedSettings {
            radius_km: 12.5,
            post_ttl_seconds: 120,
        },
    );
    controller.initialize().await;
    controller.set_draft("custom");
    controller.post().await;

    assert_eq!(
        feed.calls(),
        [
            FeedCall::Fetch {
                radius_km: 12.5,
                center: Coordinate::ORIGIN,
            },
            FeedCall::Submit {
                location: Coordinate::ORIGIN,
                content: "custom".into(),
                ttl_seconds: 120,
            },
            FeedCall::Fetch {
                radius_km: 12.5,
                center: Coordinate::ORIGIN,
            },
        ]
    );
}

#[tokio::test]
async fn bundled_location_providers() {
    let fixed = FixedLocationProvider::new(Some(london()));
    assert!(fixed.is_secure_context());
    assert_eq!(fixed.current_position().await.expect("position"), london());

    let missing = FixedLocationProvider::new(None);
    assert!(matches!(
        missing.current_position().await,
        Err(FeedError::LocationUnavailable(_))
    ));

    assert!(!InsecureContext.is_secure_context());
    assert!(InsecureContext.current_position().await.is_err());
}
