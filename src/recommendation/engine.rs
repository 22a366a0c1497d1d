//! Explore ranking engine
//!
//! Scores and orders creators and posts into the sections of the Explore
//! surface. Ranking is a pure function of the viewer, the candidate pool, the
//! options and the clock value passed in: the same snapshot always yields
//! the same sections in the same order, whatever order the pool arrived in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use super::features::{self, MetricRange};
use super::options::RankerOptions;
use super::preferences::ViewerAffinity;
use crate::entitlement::{self, EntitlementState};
use crate::models::{CandidatePool, Creator, Post, Viewer};

/// Which discovery section a list belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "category", rename_all = "snake_case")]
pub enum SectionKind {
    Trending,
    RisingStars,
    ForYou,
    Category(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Creator,
    Post,
}

/// Why a candidate was recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateReason {
    Trending,
    Rising,
    CategoryMatch,
    SimilarToFollowed,
    NewCreator,
}

impl std::fmt::Display for CandidateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateReason::Trending => write!(f, "trending"),
            CandidateReason::Rising => write!(f, "rising"),
            CandidateReason::CategoryMatch => write!(f, "category_match"),
            CandidateReason::SimilarToFollowed => write!(f, "similar_to_followed"),
            CandidateReason::NewCreator => write!(f, "new_creator"),
        }
    }
}

/// A scored creator or post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub id: String,
    pub creator_id: String,
    pub category: Option<String>,
    pub score: f64,
    pub reason: CandidateReason,
}

/// One ranked section of the Explore page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub candidates: Vec<Candidate>,
}

impl Section {
    fn new(kind: SectionKind, candidates: Vec<Candidate>) -> Self {
        Self { kind, candidates }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.id.as_str()).collect()
    }
}

/// Rank `pool` for `viewer` with `options` as of `now`
pub fn rank(
    viewer: &Viewer,
    pool: &CandidatePool,
    options: &RankerOptions,
    now: DateTime<Utc>,
) -> Vec<Section> {
    Ranker::new(options.clone()).rank(viewer, pool, now)
}

/// Ranker holding sanitized options. Cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    options: RankerOptions,
}

/// Creator or post that survived filtering, with its normalised category
struct Eligible<'a, T> {
    item: &'a T,
    category: Option<String>,
}

/// Everything needed to score posts with the For You formula
struct PostScoringContext<'a> {
    options: &'a RankerOptions,
    affinity: &'a ViewerAffinity,
    creators: &'a HashMap<&'a str, &'a Creator>,
    now: DateTime<Utc>,
}

impl Ranker {
    pub fn new(options: RankerOptions) -> Self {
        Self {
            options: options.sanitized(),
        }
    }

    pub fn options(&self) -> &RankerOptions {
        &self.options
    }

    /// Rank against the wall clock
    pub fn rank_now(&self, viewer: &Viewer, pool: &CandidatePool) -> Vec<Section> {
        self.rank(viewer, pool, Utc::now())
    }

    /// Produce Trending, Rising Stars, For You and the category buckets, in
    /// that order. An empty pool yields the three fixed sections, empty.
    pub fn rank(&self, viewer: &Viewer, pool: &CandidatePool, now: DateTime<Utc>) -> Vec<Section> {
        let creator_index = pool.creator_index();
        let creators = self.eligible_creators(viewer, pool);
        let posts = self.eligible_posts(viewer, pool, &creator_index);
        let affinity = ViewerAffinity::build(viewer, pool, &creator_index);

        let trending = self.rank_trending(&creators);
        let trending_ids: HashSet<&str> = trending.iter().map(|c| c.id.as_str()).collect();
        let rising = self.rank_rising(&creators, &trending_ids, now);

        let ctx = PostScoringContext {
            options: &self.options,
            affinity: &affinity,
            creators: &creator_index,
            now,
        };

        let for_you_pool: Vec<&Eligible<'_, Post>> = posts
            .iter()
            .filter(|p| !self.is_seen(viewer, p.item))
            .collect();
        let for_you = rank_posts(&ctx, &for_you_pool, None, self.options.limit());

        let mut sections = vec![
            Section::new(SectionKind::Trending, trending),
            Section::new(SectionKind::RisingStars, rising),
            Section::new(SectionKind::ForYou, for_you),
        ];

        let (bucket_names, keep_empty) = match &self.options.categories {
            Some(configured) => (configured.clone(), true),
            None => {
                let derived: BTreeSet<String> =
                    creators.iter().filter_map(|c| c.category.clone()).collect();
                (derived.into_iter().collect::<Vec<_>>(), false)
            }
        };

        for bucket in bucket_names {
            let bucket_pool: Vec<&Eligible<'_, Post>> = for_you_pool
                .iter()
                .copied()
                .filter(|p| p.category.as_deref() == Some(bucket.as_str()))
                .collect();
            let candidates = rank_posts(&ctx, &bucket_pool, Some(&bucket), self.options.limit());
            if candidates.is_empty() && !keep_empty {
                continue;
            }
            sections.push(Section::new(SectionKind::Category(bucket), candidates));
        }

        debug!(
            viewer = viewer.id().unwrap_or("anonymous"),
            creators = creators.len(),
            posts = posts.len(),
            sections = sections.len(),
            "Ranked explore sections"
        );

        sections
    }

    // ---- Filtering ----

    fn gate_blocks(&self, viewer: &Viewer, nsfw: bool) -> bool {
        self.options.content_rating_gate && nsfw && !viewer.allows_nsfw()
    }

    /// Creators the viewer may be shown: not their own profile, not marked
    /// not-interested, and past the content-rating gate. Sorted by id.
    fn eligible_creators<'a>(
        &self,
        viewer: &Viewer,
        pool: &'a CandidatePool,
    ) -> Vec<Eligible<'a, Creator>> {
        let mut out: Vec<Eligible<'a, Creator>> = pool
            .creators
            .iter()
            .filter(|c| !viewer.is_creator(&c.id))
            .filter(|c| !is_not_interested(viewer, &c.id))
            .filter(|c| !self.gate_blocks(viewer, c.content_rating.is_nsfw()))
            .map(|c| Eligible {
                item: c,
                category: c.category_key(),
            })
            .collect();
        out.sort_by(|a, b| a.item.id.cmp(&b.item.id));
        out
    }

    /// Posts the viewer may be shown. Sorted by id.
    fn eligible_posts<'a>(
        &self,
        viewer: &Viewer,
        pool: &'a CandidatePool,
        creators: &HashMap<&str, &'a Creator>,
    ) -> Vec<Eligible<'a, Post>> {
        let mut out: Vec<Eligible<'a, Post>> = pool
            .posts
            .iter()
            .filter(|p| !viewer.is_creator(&p.creator_id))
            .filter(|p| !is_not_interested(viewer, &p.creator_id))
            .filter(|p| {
                let creator_nsfw = creators
                    .get(p.creator_id.as_str())
                    .is_some_and(|c| c.content_rating.is_nsfw());
                !self.gate_blocks(viewer, p.content_rating.is_nsfw() || creator_nsfw)
            })
            .filter(|p| {
                !self.options.hide_fully_locked
                    || entitlement::resolve(viewer, p).state != EntitlementState::LockedNoPreview
            })
            .map(|p| Eligible {
                item: p,
                category: creators
                    .get(p.creator_id.as_str())
                    .and_then(|c| c.category_key()),
            })
            .collect();
        out.sort_by(|a, b| a.item.id.cmp(&b.item.id));
        out
    }

    fn is_seen(&self, viewer: &Viewer, post: &Post) -> bool {
        self.options.exclude_seen
            && viewer
                .profile()
                .is_some_and(|profile| profile.has_engaged_with(&post.id))
    }

    // ---- Creator sections ----

    fn rank_trending(&self, creators: &[Eligible<'_, Creator>]) -> Vec<Candidate> {
        let w = &self.options.weights.trending;
        let growth = MetricRange::over(creators.iter().map(|c| c.item.metrics.subscriber_growth_rate));
        let engagement =
            MetricRange::over(creators.iter().map(|c| c.item.metrics.recent_engagement_rate));
        let views = MetricRange::over(creators.iter().map(|c| c.item.metrics.view_count));

        let mut scored: Vec<(f64, &Eligible<'_, Creator>)> = creators
            .iter()
            .map(|c| {
                let m = &c.item.metrics;
                let score = w.subscriber_growth_rate * scaled(growth, m.subscriber_growth_rate)
                    + w.recent_engagement_rate * scaled(engagement, m.recent_engagement_rate)
                    + w.view_count * scaled(views, m.view_count);
                (score, c)
            })
            .collect();

        // higher score, then more subscribers, then id
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| b.item.subscriber_count.cmp(&a.item.subscriber_count))
                .then_with(|| a.item.id.cmp(&b.item.id))
        });

        scored
            .into_iter()
            .take(self.options.limit())
            .map(|(score, c)| creator_candidate(c, score, CandidateReason::Trending))
            .collect()
    }

    fn rank_rising(
        &self,
        creators: &[Eligible<'_, Creator>],
        trending_ids: &HashSet<&str>,
        now: DateTime<Utc>,
    ) -> Vec<Candidate> {
        let w = &self.options.weights.rising_stars;
        let window = self.options.rising_star_window();
        let pool: Vec<&Eligible<'_, Creator>> = creators
            .iter()
            .filter(|c| !trending_ids.contains(c.item.id.as_str()))
            .filter(|c| features::is_within_window(c.item.created_at, now, window))
            .collect();

        let engagement = MetricRange::over(pool.iter().map(|c| c.item.metrics.engagement_rate));
        let growth = MetricRange::over(pool.iter().map(|c| c.item.metrics.follower_growth));

        let mut scored: Vec<(f64, &Eligible<'_, Creator>)> = pool
            .into_iter()
            .map(|c| {
                let m = &c.item.metrics;
                let score = w.engagement_rate * scaled(engagement, m.engagement_rate)
                    + w.follower_growth * scaled(growth, m.follower_growth);
                (score, c)
            })
            .collect();

        // higher score, then newer creator, then id
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| b.item.created_at.cmp(&a.item.created_at))
                .then_with(|| a.item.id.cmp(&b.item.id))
        });

        scored
            .into_iter()
            .take(self.options.limit())
            .map(|(score, c)| creator_candidate(c, score, CandidateReason::Rising))
            .collect()
    }
}

// ---- Post sections ----

/// Score posts with the For You formula. Popularity is normalised over the
/// given pool, so a bucket is ranked as its own pool.
fn rank_posts(
    ctx: &PostScoringContext<'_>,
    posts: &[&Eligible<'_, Post>],
    bucket: Option<&str>,
    limit: usize,
) -> Vec<Candidate> {
    let w = &ctx.options.weights.for_you;
    let lambda = ctx.options.decay_lambda();
    let window = ctx.options.rising_star_window();
    let popularity = MetricRange::over(posts.iter().map(|p| features::post_popularity(p.item)));

    let mut scored: Vec<(f64, CandidateReason, &Eligible<'_, Post>)> = posts
        .iter()
        .map(|p| {
            let post = p.item;
            let category = p.category.as_deref();

            let category_contrib = w.category_affinity * ctx.affinity.category_affinity(category);
            let similar_contrib =
                w.similar_to_followed * ctx.affinity.similar_to_followed(&post.creator_id, category);
            let recency = features::recency_decay(post.published_at, ctx.now, lambda);
            let pop = scaled(popularity, features::post_popularity(post));

            let score =
                category_contrib + similar_contrib + w.recency_decay * recency + w.popularity * pop;

            let reason = if bucket.is_some() {
                CandidateReason::CategoryMatch
            } else if category_contrib > 0.0 || similar_contrib > 0.0 {
                if category_contrib >= similar_contrib {
                    CandidateReason::CategoryMatch
                } else {
                    CandidateReason::SimilarToFollowed
                }
            } else {
                let is_new = ctx
                    .creators
                    .get(post.creator_id.as_str())
                    .is_some_and(|c| features::is_within_window(c.created_at, ctx.now, window));
                if is_new {
                    CandidateReason::NewCreator
                } else {
                    CandidateReason::Trending
                }
            };

            (score, reason, *p)
        })
        .collect();

    // higher score, then more recent post, then id
    scored.sort_by(|(sa, _, a), (sb, _, b)| {
        sb.total_cmp(sa)
            .then_with(|| b.item.published_at.cmp(&a.item.published_at))
            .then_with(|| a.item.id.cmp(&b.item.id))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(score, reason, p)| Candidate {
            kind: CandidateKind::Post,
            id: p.item.id.clone(),
            creator_id: p.item.creator_id.clone(),
            category: p.category.clone(),
            score,
            reason,
        })
        .collect()
}

fn creator_candidate(c: &Eligible<'_, Creator>, score: f64, reason: CandidateReason) -> Candidate {
    Candidate {
        kind: CandidateKind::Creator,
        id: c.item.id.clone(),
        creator_id: c.item.id.clone(),
        category: c.category.clone(),
        score,
        reason,
    }
}

fn scaled(range: Option<MetricRange>, value: Option<f64>) -> f64 {
    range.map(|r| r.normalize(value)).unwrap_or(0.0)
}

fn is_not_interested(viewer: &Viewer, creator_id: &str) -> bool {
    viewer
        .profile()
        .is_some_and(|p| p.is_not_interested_in(creator_id))
}
