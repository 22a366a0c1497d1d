//! Viewer affinity signals
//!
//! Builds the per-call view of what a viewer cares about: explicit category
//! affinity from the profile, category shares derived from the posts they
//! liked or viewed, and the categories of the creators they follow. Nothing
//! is persisted between calls.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{CandidatePool, Creator, Viewer};

/// Affinity snapshot for one ranking call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerAffinity {
    explicit: BTreeMap<String, f64>,
    history: BTreeMap<String, f64>,
    followed: BTreeSet<String>,
    followed_by_category: BTreeMap<String, usize>,
    followed_in_pool: usize,
}

impl ViewerAffinity {
    /// Derive affinity for `viewer` from the full (unfiltered) pool
    pub fn build(viewer: &Viewer, pool: &CandidatePool, creators: &HashMap<&str, &Creator>) -> Self {
        let Some(profile) = viewer.profile() else {
            return Self::default();
        };

        let mut explicit = BTreeMap::new();
        for (category, weight) in &profile.category_affinity {
            if let Some(key) = crate::models::category_key(category) {
                let weight = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 };
                let slot = explicit.entry(key).or_insert(0.0f64);
                *slot = slot.max(weight);
            }
        }

        // Share of engaged posts per category
        let mut engaged_total = 0usize;
        let mut engaged_by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut counted = BTreeSet::new();
        for post in &pool.posts {
            if !profile.has_engaged_with(&post.id) || !counted.insert(post.id.as_str()) {
                continue;
            }
            engaged_total += 1;
            if let Some(key) = creators.get(post.creator_id.as_str()).and_then(|c| c.category_key()) {
                *engaged_by_category.entry(key).or_insert(0) += 1;
            }
        }
        let history = engaged_by_category
            .into_iter()
            .map(|(key, count)| (key, count as f64 / engaged_total as f64))
            .collect();

        let mut followed_in_pool = 0usize;
        let mut followed_by_category: BTreeMap<String, usize> = BTreeMap::new();
        for creator_id in &profile.followed_creator_ids {
            if let Some(creator) = creators.get(creator_id.as_str()) {
                followed_in_pool += 1;
                if let Some(key) = creator.category_key() {
                    *followed_by_category.entry(key).or_insert(0) += 1;
                }
            }
        }

        Self {
            explicit,
            history,
            followed: profile.followed_creator_ids.clone(),
            followed_by_category,
            followed_in_pool,
        }
    }

    /// Stronger of the explicit and engagement-derived affinity, in [0, 1]
    pub fn category_affinity(&self, category: Option<&str>) -> f64 {
        let Some(category) = category else {
            return 0.0;
        };
        let explicit = self.explicit.get(category).copied().unwrap_or(0.0);
        let history = self.history.get(category).copied().unwrap_or(0.0);
        explicit.max(history)
    }

    /// 1 for followed creators, otherwise the share of followed creators
    /// that publish in the same category
    pub fn similar_to_followed(&self, creator_id: &str, category: Option<&str>) -> f64 {
        if self.followed.contains(creator_id) {
            return 1.0;
        }
        if self.followed_in_pool == 0 {
            return 0.0;
        }
        category
            .and_then(|c| self.followed_by_category.get(c))
            .map(|count| *count as f64 / self.followed_in_pool as f64)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Post, ViewerProfile};

    fn creator(id: &str, category: &str) -> Creator {
        serde_json::from_value(serde_json::json!({ "id": id, "category": category })).unwrap()
    }

    fn post(id: &str, creator_id: &str) -> Post {
        serde_json::from_value(serde_json::json!({ "id": id, "creator_id": creator_id })).unwrap()
    }

    fn pool() -> CandidatePool {
        CandidatePool::new(
            vec![
                creator("c1", "Fitness"),
                creator("c2", "fitness"),
                creator("c3", "cooking"),
            ],
            vec![post("p1", "c1"), post("p2", "c3"), post("p3", "c3"), post("p4", "c2")],
        )
    }

    #[test]
    fn test_anonymous_has_no_affinity() {
        let pool = pool();
        let index = pool.creator_index();
        let affinity = ViewerAffinity::build(&Viewer::Anonymous, &pool, &index);
        assert_eq!(affinity.category_affinity(Some("fitness")), 0.0);
        assert_eq!(affinity.similar_to_followed("c1", Some("fitness")), 0.0);
    }

    #[test]
    fn test_history_share_and_explicit_affinity() {
        let pool = pool();
        let index = pool.creator_index();
        let mut profile = ViewerProfile::new("v1");
        profile.liked_post_ids.insert("p2".into());
        profile.viewed_post_ids.insert("p3".into());
        profile.viewed_post_ids.insert("p1".into());
        profile.liked_post_ids.insert("p1".into());
        profile.category_affinity.insert("Fitness".into(), 0.9);
        profile.category_affinity.insert("music".into(), 7.0);

        let affinity = ViewerAffinity::build(&Viewer::from(profile), &pool, &index);
        assert!((affinity.category_affinity(Some("cooking")) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(affinity.category_affinity(Some("fitness")), 0.9);
        assert_eq!(affinity.category_affinity(Some("music")), 1.0);
        assert_eq!(affinity.category_affinity(None), 0.0);
    }

    #[test]
    fn test_similar_to_followed() {
        let pool = pool();
        let index = pool.creator_index();
        let mut profile = ViewerProfile::new("v1");
        profile.followed_creator_ids.insert("c1".into());
        profile.followed_creator_ids.insert("c3".into());
        profile.followed_creator_ids.insert("gone".into());

        let affinity = ViewerAffinity::build(&Viewer::from(profile), &pool, &index);
        assert_eq!(affinity.similar_to_followed("c1", Some("fitness")), 1.0);
        assert_eq!(affinity.similar_to_followed("c2", Some("fitness")), 0.5);
        assert_eq!(affinity.similar_to_followed("c9", Some("music")), 0.0);
    }
}
