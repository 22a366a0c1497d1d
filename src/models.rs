//! Snapshot types for creators, posts and viewers
//!
//! These are read-only views of whatever the backing store returns. They are
//! built fresh for every resolution/ranking call and never mutated by the
//! entitlement or ranking code.
//!
//! Deserialization is lenient in the restrictive direction: unknown keys are
//! ignored and a missing or unrecognised visibility/content rating falls back
//! to the most locked-down value, so malformed rows never expose content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::serde_helpers;

/// Who may see a post's media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Free,
    #[default]
    Subscribers,
    Vip,
    Premium,
}

impl Visibility {
    /// Parse a tier name; anything unrecognised is treated as `Subscribers`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" | "public" => Visibility::Free,
            "vip" => Visibility::Vip,
            "premium" => Visibility::Premium,
            _ => Visibility::Subscribers,
        }
    }

    pub fn is_free(self) -> bool {
        matches!(self, Visibility::Free)
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_helpers::opt_raw_string(deserializer)?;
        Ok(raw.as_deref().map(Visibility::parse).unwrap_or_default())
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Free => write!(f, "free"),
            Visibility::Subscribers => write!(f, "subscribers"),
            Visibility::Vip => write!(f, "vip"),
            Visibility::Premium => write!(f, "premium"),
        }
    }
}

/// Content rating of a creator or post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    Sfw,
    #[default]
    Nsfw,
}

impl ContentRating {
    /// Parse a rating; unknown values are treated as `Nsfw`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sfw" | "safe" => ContentRating::Sfw,
            _ => ContentRating::Nsfw,
        }
    }

    pub fn is_nsfw(self) -> bool {
        matches!(self, ContentRating::Nsfw)
    }
}

impl<'de> Deserialize<'de> for ContentRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_helpers::opt_raw_string(deserializer)?;
        Ok(raw.as_deref().map(ContentRating::parse).unwrap_or_default())
    }
}

/// Raw ranking signals for a creator. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatorMetrics {
    #[serde(default, deserialize_with = "serde_helpers::opt_metric")]
    pub subscriber_growth_rate: Option<f64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_metric")]
    pub recent_engagement_rate: Option<f64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_metric")]
    pub view_count: Option<f64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_metric")]
    pub engagement_rate: Option<f64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_metric")]
    pub follower_growth: Option<f64>,
}

/// Creator profile snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    pub id: String,
    #[serde(default, deserialize_with = "serde_helpers::opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "serde_helpers::flag")]
    pub verified: bool,
    #[serde(default, deserialize_with = "serde_helpers::count")]
    pub subscriber_count: u64,
    #[serde(default, deserialize_with = "serde_helpers::count")]
    pub follower_count: u64,
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub last_post_at: Option<DateTime<Utc>>,
    /// When the creator profile was opened ("creator since")
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_rating: ContentRating,
    /// Monthly subscription price in minor currency units
    #[serde(default, deserialize_with = "serde_helpers::opt_count")]
    pub subscription_price: Option<u64>,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub metrics: CreatorMetrics,
}

impl Creator {
    /// Normalised category key (trimmed, lowercase), if any
    pub fn category_key(&self) -> Option<String> {
        self.category.as_deref().and_then(category_key)
    }
}

/// Post snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub creator_id: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Pay-per-view price in minor currency units
    #[serde(default, deserialize_with = "serde_helpers::opt_count")]
    pub price: Option<u64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_string")]
    pub thumbnail_url: Option<String>,
    #[serde(default, deserialize_with = "serde_helpers::opt_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "serde_helpers::opt_count")]
    pub likes: Option<u64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_count")]
    pub comments: Option<u64>,
    #[serde(default, deserialize_with = "serde_helpers::opt_count")]
    pub views: Option<u64>,
    #[serde(default)]
    pub content_rating: ContentRating,
}

impl Post {
    /// A blank thumbnail URL counts as no thumbnail
    pub fn has_preview(&self) -> bool {
        self.thumbnail_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// Signed-in viewer snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerProfile {
    pub id: String,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub subscribed_creator_ids: BTreeSet<String>,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub followed_creator_ids: BTreeSet<String>,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub not_interested_creator_ids: BTreeSet<String>,
    #[serde(default, deserialize_with = "serde_helpers::opt_string")]
    pub country: Option<String>,
    /// category -> affinity weight, expected in [0, 1]
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub category_affinity: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub liked_post_ids: BTreeSet<String>,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub viewed_post_ids: BTreeSet<String>,
    /// Passed the age gate and opted into nsfw content
    #[serde(default, deserialize_with = "serde_helpers::flag")]
    pub nsfw_enabled: bool,
}

impl ViewerProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_subscribed_to(&self, creator_id: &str) -> bool {
        self.subscribed_creator_ids.contains(creator_id)
    }

    pub fn follows(&self, creator_id: &str) -> bool {
        self.followed_creator_ids.contains(creator_id)
    }

    pub fn is_not_interested_in(&self, creator_id: &str) -> bool {
        self.not_interested_creator_ids.contains(creator_id)
    }

    /// Liked or viewed
    pub fn has_engaged_with(&self, post_id: &str) -> bool {
        self.liked_post_ids.contains(post_id) || self.viewed_post_ids.contains(post_id)
    }
}

/// The viewer of a page: either nobody is signed in or a known profile
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(ViewerProfile),
}

impl Viewer {
    pub fn profile(&self) -> Option<&ViewerProfile> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(profile) => Some(profile),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.profile().map(|p| p.id.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Viewer::Anonymous)
    }

    /// True if the viewer is the creator with this id
    pub fn is_creator(&self, creator_id: &str) -> bool {
        self.id() == Some(creator_id)
    }

    pub fn allows_nsfw(&self) -> bool {
        self.profile().is_some_and(|p| p.nsfw_enabled)
    }
}

impl From<ViewerProfile> for Viewer {
    fn from(profile: ViewerProfile) -> Self {
        Viewer::Authenticated(profile)
    }
}

impl From<Option<ViewerProfile>> for Viewer {
    fn from(profile: Option<ViewerProfile>) -> Self {
        profile.map(Viewer::Authenticated).unwrap_or_default()
    }
}

/// Creators and posts handed to the ranker for one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidatePool {
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub creators: Vec<Creator>,
    #[serde(default, deserialize_with = "serde_helpers::null_as_default")]
    pub posts: Vec<Post>,
}

impl CandidatePool {
    pub fn new(creators: Vec<Creator>, posts: Vec<Post>) -> Self {
        Self { creators, posts }
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty() && self.posts.is_empty()
    }

    /// Index creators by id. First occurrence wins on duplicate ids.
    pub fn creator_index(&self) -> HashMap<&str, &Creator> {
        let mut index = HashMap::with_capacity(self.creators.len());
        for creator in &self.creators {
            index.entry(creator.id.as_str()).or_insert(creator);
        }
        index
    }
}

/// Normalise a category name for comparisons. Blank names are dropped.
pub fn category_key(raw: &str) -> Option<String> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_visibility_is_subscribers() {
        let post: Post = serde_json::from_str(r#"{"id":"p1","creator_id":"c1"}"#).unwrap();
        assert_eq!(post.visibility, Visibility::Subscribers);
        assert_eq!(post.content_rating, ContentRating::Nsfw);
        assert!(!post.has_preview());
    }

    #[test]
    fn test_unknown_visibility_fails_closed() {
        let post: Post = serde_json::from_str(
            r#"{"id":"p1","creator_id":"c1","visibility":"everyone?","thumbnail_url":"  "}"#,
        )
        .unwrap();
        assert_eq!(post.visibility, Visibility::Subscribers);
        assert!(!post.has_preview());

        let post: Post =
            serde_json::from_str(r#"{"id":"p1","creator_id":"c1","visibility":null}"#).unwrap();
        assert_eq!(post.visibility, Visibility::Subscribers);
    }

    #[test]
    fn test_malformed_fields_do_not_reject_pool() {
        let pool: CandidatePool = serde_json::from_str(
            r#"{
                "creators": [
                    {"id": "c1", "subscriber_count": null, "verified": null,
                     "metrics": {"view_count": "lots", "engagement_rate": 0.4}},
                    {"id": "c2", "created_at": "last week", "content_rating": 7}
                ],
                "posts": [
                    {"id": "p1", "creator_id": "c1", "likes": -1, "views": 12.0},
                    {"id": "p2", "creator_id": "c2", "visibility": 1, "published_at": 42}
                ]
            }"#,
        )
        .unwrap();

        let c1 = &pool.creators[0];
        assert_eq!(c1.subscriber_count, 0);
        assert!(!c1.verified);
        assert_eq!(c1.metrics.view_count, None);
        assert_eq!(c1.metrics.engagement_rate, Some(0.4));

        let c2 = &pool.creators[1];
        assert_eq!(c2.created_at, None);
        assert_eq!(c2.content_rating, ContentRating::Nsfw);

        assert_eq!(pool.posts[0].likes, None);
        assert_eq!(pool.posts[0].views, Some(12));
        assert_eq!(pool.posts[1].visibility, Visibility::Subscribers);
        assert_eq!(pool.posts[1].published_at, None);
    }

    #[test]
    fn test_null_collections_are_empty() {
        let profile: ViewerProfile = serde_json::from_str(
            r#"{"id": "v1", "subscribed_creator_ids": null, "category_affinity": null, "nsfw_enabled": "true"}"#,
        )
        .unwrap();
        assert!(profile.subscribed_creator_ids.is_empty());
        assert!(profile.category_affinity.is_empty());
        assert!(profile.nsfw_enabled);

        let pool: CandidatePool = serde_json::from_str(r#"{"creators": null}"#).unwrap();
        assert!(pool.is_empty());
    }

    #[test]
    fn test_known_tiers_parse() {
        assert_eq!(Visibility::parse("FREE"), Visibility::Free);
        assert_eq!(Visibility::parse("vip"), Visibility::Vip);
        assert_eq!(Visibility::parse("premium"), Visibility::Premium);
        assert_eq!(ContentRating::parse("sfw"), ContentRating::Sfw);
    }

    #[test]
    fn test_viewer_from_optional_profile() {
        assert!(Viewer::from(None::<ViewerProfile>).is_anonymous());
        let viewer = Viewer::from(Some(ViewerProfile::new("v1")));
        assert_eq!(viewer.id(), Some("v1"));
        assert!(viewer.is_creator("v1"));
        assert!(!viewer.allows_nsfw());
    }

    #[test]
    fn test_category_key_normalises() {
        assert_eq!(category_key("  Fitness "), Some("fitness".to_string()));
        assert_eq!(category_key("   "), None);
    }
}
