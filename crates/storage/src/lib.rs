use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{Coordinate, Post, PostId},
    geo,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Storage for posts that are still alive.
///
/// Implementations drop expired posts before every save and every read, so
/// callers never observe a post past `created_at + duration`.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn save_post(&self, post: Post) -> Result<()>;
    async fn nearby_posts(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Post>>;
    async fn health_check(&self) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Indexed,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "indexed" | "indexed_memory" => Ok(Self::Indexed),
            other => Err(anyhow!("unknown store kind '{other}'")),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Indexed => f.write_str("indexed"),
        }
    }
}

pub fn open_store(kind: StoreKind) -> Arc<dyn PostStore> {
    match kind {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::Indexed => Arc::new(IndexedMemoryStore::new()),
    }
}

fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Linear scan over every live post, in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreState>,
}

#[derive(Default)]
struct MemoryStoreState {
    posts: Vec<Post>,
    closed: bool,
}

impl MemoryStoreState {
    fn purge_expired(&mut self, now: i64) {
        let before = self.posts.len();
        self.posts.retain(|post| !post.is_expired(now));
        let expired = before - self.posts.len();
        if expired > 0 {
            debug!(expired, "purged expired posts");
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn save_post(&self, post: Post) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            bail!("memory store is closed");
        }
        guard.purge_expired(unix_now());
        guard.posts.push(post);
        Ok(())
    }

    async fn nearby_posts(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Post>> {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            bail!("memory store is closed");
        }
        guard.purge_expired(unix_now());
        Ok(guard
            .posts
            .iter()
            .filter(|post| geo::within_radius(center, post.location, radius_km))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        if self.inner.lock().await.closed {
            bail!("memory store is closed");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.posts.clear();
        guard.closed = true;
        Ok(())
    }
}

type CellKey = (i32, i32);

/// Buckets posts into one-degree cells so a query only scans the cells that
/// can intersect its search circle.
///
/// The longitude span widens with latitude; once the circle reaches a pole
/// every live post is a candidate. Results always match [`MemoryStore`].
#[derive(Default)]
pub struct IndexedMemoryStore {
    inner: Mutex<IndexedStoreState>,
}

#[derive(Default)]
struct IndexedStoreState {
    cells: HashMap<CellKey, Vec<PostId>>,
    posts: HashMap<PostId, IndexedPost>,
    next_seq: u64,
    closed: bool,
}

struct IndexedPost {
    seq: u64,
    post: Post,
}

fn wrap_longitude_cell(longitude: i32) -> i32 {
    (longitude + 180).rem_euclid(360) - 180
}

fn cell_for(location: Coordinate) -> CellKey {
    (
        location.latitude.round() as i32,
        wrap_longitude_cell(location.longitude.round() as i32),
    )
}

/// Cell offsets that cover every point within `radius_km` of `center`, or
/// `None` when the circle wraps the whole ring of longitudes.
fn search_span(center: Coordinate, radius_km: f64) -> Option<(i32, i32)> {
    let angular = (radius_km / geo::EARTH_RADIUS_KM).clamp(0.0, std::f64::consts::PI);
    let lat_delta = angular.to_degrees();
    if center.latitude.abs() + lat_delta >= 90.0 {
        return None;
    }
    // Widest longitude offset of a circle that does not contain a pole.
    let ratio = angular.sin() / center.latitude.to_radians().cos();
    if ratio >= 1.0 {
        return None;
    }
    let lon_delta = ratio.asin().to_degrees();
    let lat_span = lat_delta.floor() as i32 + 1;
    let lon_span = lon_delta.floor() as i32 + 1;
    (lon_span < 180).then_some((lat_span, lon_span))
}

fn neighbourhood(center: CellKey, (lat_span, lon_span): (i32, i32)) -> impl Iterator<Item = CellKey> {
    (-lat_span..=lat_span).flat_map(move |d_lat| {
        (-lon_span..=lon_span)
            .map(move |d_lon| (center.0 + d_lat, wrap_longitude_cell(center.1 + d_lon)))
    })
}

impl IndexedStoreState {
    fn insert(&mut self, post: Post, id: PostId) {
        if let Some(previous) = self.posts.remove(&id) {
            self.unlink(id, previous.post.location);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.cells.entry(cell_for(post.location)).or_default().push(id);
        self.posts.insert(id, IndexedPost { seq, post });
    }

    fn unlink(&mut self, id: PostId, location: Coordinate) {
        let key = cell_for(location);
        if let Some(ids) = self.cells.get_mut(&key) {
            if let Some(position) = ids.iter().position(|candidate| *candidate == id) {
                ids.swap_remove(position);
            }
            if ids.is_empty() {
                self.cells.remove(&key);
            }
        }
    }

    fn purge_expired(&mut self, now: i64) {
        let expired: Vec<(PostId, Coordinate)> = self
            .posts
            .iter()
            .filter(|(_, entry)| entry.post.is_expired(now))
            .map(|(id, entry)| (*id, entry.post.location))
            .collect();
        for (id, location) in &expired {
            self.posts.remove(id);
            self.unlink(*id, *location);
        }
        if !expired.is_empty() {
            debug!(expired = expired.len(), "purged expired posts");
        }
    }

    fn candidates(&self, center: Coordinate, radius_km: f64) -> Vec<&IndexedPost> {
        let Some(span) = search_span(center, radius_km) else {
            return self.posts.values().collect();
        };
        neighbourhood(cell_for(center), span)
            .filter_map(|key| self.cells.get(&key))
            .flatten()
            .filter_map(|id| self.posts.get(id))
            .collect()
    }
}

impl IndexedMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostStore for IndexedMemoryStore {
    async fn save_post(&self, mut post: Post) -> Result<()> {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            bail!("indexed store is closed");
        }
        guard.purge_expired(unix_now());
        let id = *post.id.get_or_insert_with(PostId::new);
        guard.insert(post, id);
        Ok(())
    }

    async fn nearby_posts(&self, center: Coordinate, radius_km: f64) -> Result<Vec<Post>> {
        let mut guard = self.inner.lock().await;
        if guard.closed {
            bail!("indexed store is closed");
        }
        guard.purge_expired(unix_now());
        let mut nearby: Vec<&IndexedPost> = guard
            .candidates(center, radius_km)
            .into_iter()
            .filter(|entry| geo::within_radius(center, entry.post.location, radius_km))
            .collect();
        nearby.sort_by_key(|entry| entry.seq);
        Ok(nearby.into_iter().map(|entry| entry.post.clone()).collect())
    }

    async fn health_check(&self) -> Result<()> {
        if self.inner.lock().await.closed {
            bail!("indexed store is closed");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.cells.clear();
        guard.posts.clear();
        guard.closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
