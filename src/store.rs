//! Snapshot store
//!
//! The ranker and resolver work on snapshots; this is where those snapshots
//! come from. `SnapshotStore` is the seam a database-backed source would
//! implement. The bundled `FixtureStore` keeps everything in memory and is
//! loaded from a JSON file, which is what the HTTP server and tests use.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{category_key, CandidatePool, Creator, Post, Viewer, ViewerProfile};

/// Narrows the candidate pool handed to the ranker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolFilter {
    /// Only creators in this category (and their posts)
    pub category: Option<String>,
    /// Only these creators (and their posts)
    pub creator_ids: Option<BTreeSet<String>>,
}

impl PoolFilter {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    fn accepts(&self, creator: &Creator) -> bool {
        let category_ok = match self.category.as_deref().and_then(category_key) {
            Some(wanted) => creator.category_key().as_deref() == Some(wanted.as_str()),
            None => true,
        };
        let id_ok = self
            .creator_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&creator.id));
        category_ok && id_ok
    }
}

/// Source of viewer and candidate snapshots
pub trait SnapshotStore: Send + Sync {
    /// Snapshot of a signed-in viewer
    fn viewer_snapshot(&self, viewer_id: &str) -> Result<Viewer>;

    /// Creators and posts matching `filter`
    fn candidate_pool(&self, filter: &PoolFilter) -> Result<CandidatePool>;
}

/// On-disk fixture layout
#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    viewers: Vec<ViewerProfile>,
    #[serde(default)]
    creators: Vec<Creator>,
    #[serde(default)]
    posts: Vec<Post>,
}

/// In-memory store backed by a fixture
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    viewers: HashMap<String, ViewerProfile>,
    pool: CandidatePool,
}

impl FixtureStore {
    pub fn new(viewers: Vec<ViewerProfile>, pool: CandidatePool) -> Self {
        let viewers = viewers.into_iter().map(|v| (v.id.clone(), v)).collect();
        Self { viewers, pool }
    }

    /// Load a fixture from JSON text
    pub fn from_json(raw: &str) -> Result<Self> {
        let fixture: FixtureFile = serde_json::from_str(raw)?;
        Ok(Self::new(
            fixture.viewers,
            CandidatePool::new(fixture.creators, fixture.posts),
        ))
    }

    /// Load a fixture file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Fixture {
            path: path.display().to_string(),
            source,
        })?;
        let store = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            viewers = store.viewer_count(),
            creators = store.pool.creators.len(),
            posts = store.pool.posts.len(),
            "Loaded snapshot fixture"
        );
        Ok(store)
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.len()
    }
}

impl SnapshotStore for FixtureStore {
    fn viewer_snapshot(&self, viewer_id: &str) -> Result<Viewer> {
        self.viewers
            .get(viewer_id)
            .cloned()
            .map(Viewer::Authenticated)
            .ok_or_else(|| Error::not_found("viewer", viewer_id))
    }

    fn candidate_pool(&self, filter: &PoolFilter) -> Result<CandidatePool> {
        let creators: Vec<Creator> = self
            .pool
            .creators
            .iter()
            .filter(|c| filter.accepts(c))
            .cloned()
            .collect();

        let unfiltered = filter.category.is_none() && filter.creator_ids.is_none();
        let kept: BTreeSet<&str> = creators.iter().map(|c| c.id.as_str()).collect();
        let posts = self
            .pool
            .posts
            .iter()
            .filter(|p| unfiltered || kept.contains(p.creator_id.as_str()))
            .cloned()
            .collect();

        Ok(CandidatePool::new(creators, posts))
    }
}
