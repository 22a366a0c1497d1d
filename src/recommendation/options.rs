//! Ranker configuration
//!
//! Every scoring weight lives here instead of in the scoring code, so callers
//! can tune the Explore surface without touching ranking logic. Options are
//! read from camelCase JSON or TOML: unknown keys are ignored, missing keys
//! take the defaults below, and out-of-range values are clamped by
//! [`RankerOptions::sanitized`] rather than rejected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::serde_helpers;

const DEFAULT_HALF_LIFE_HOURS: f64 = 48.0;
const DEFAULT_LIMIT_PER_SECTION: i64 = 20;
const DEFAULT_RISING_STAR_WINDOW_DAYS: i64 = 30;
/// Keeps the window inside what `chrono::Duration` can represent
const MAX_WINDOW_DAYS: i64 = 36_500;

/// Trending section weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrendingWeights {
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub subscriber_growth_rate: f64,
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub recent_engagement_rate: f64,
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub view_count: f64,
}

impl Default for TrendingWeights {
    fn default() -> Self {
        Self {
            subscriber_growth_rate: 0.5,
            recent_engagement_rate: 0.3,
            view_count: 0.2,
        }
    }
}

/// Rising Stars section weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RisingStarWeights {
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub engagement_rate: f64,
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub follower_growth: f64,
}

impl Default for RisingStarWeights {
    fn default() -> Self {
        Self {
            engagement_rate: 0.6,
            follower_growth: 0.4,
        }
    }
}

/// For You and category bucket weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForYouWeights {
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub category_affinity: f64,
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub similar_to_followed: f64,
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub recency_decay: f64,
    #[serde(deserialize_with = "serde_helpers::metric_or_zero")]
    pub popularity: f64,
}

impl Default for ForYouWeights {
    fn default() -> Self {
        Self {
            category_affinity: 0.4,
            similar_to_followed: 0.3,
            recency_decay: 0.2,
            popularity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringWeights {
    pub trending: TrendingWeights,
    pub rising_stars: RisingStarWeights,
    pub for_you: ForYouWeights,
}

/// Options for one ranking call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RankerOptions {
    pub weights: ScoringWeights,
    /// Hours after which a post's recency contribution halves
    #[serde(deserialize_with = "half_life_or_default")]
    pub recency_half_life_hours: f64,
    #[serde(deserialize_with = "limit_or_default")]
    pub limit_per_section: i64,
    /// Drop posts that would render as a bare paywall card
    #[serde(deserialize_with = "serde_helpers::flag")]
    pub hide_fully_locked: bool,
    #[serde(deserialize_with = "window_or_default")]
    pub rising_star_window_days: i64,
    /// Drop nsfw creators and posts unless the viewer opted in. Off unless
    /// the caller asks for it; missing ratings count as nsfw.
    #[serde(deserialize_with = "serde_helpers::flag")]
    pub content_rating_gate: bool,
    /// Drop posts the viewer already liked or viewed
    #[serde(deserialize_with = "serde_helpers::flag")]
    pub exclude_seen: bool,
    /// Fixed list of category buckets; derived from the pool when absent
    pub categories: Option<Vec<String>>,
}

impl Default for RankerOptions {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            recency_half_life_hours: DEFAULT_HALF_LIFE_HOURS,
            limit_per_section: DEFAULT_LIMIT_PER_SECTION,
            hide_fully_locked: false,
            rising_star_window_days: DEFAULT_RISING_STAR_WINDOW_DAYS,
            content_rating_gate: false,
            exclude_seen: false,
            categories: None,
        }
    }
}

impl RankerOptions {
    /// Parse options from JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str::<Self>(raw)?.sanitized())
    }

    /// Parse options from TOML
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str::<Self>(raw)?.sanitized())
    }

    /// Clamp every value into its usable range
    pub fn sanitized(mut self) -> Self {
        let w = &mut self.weights;
        for weight in [
            &mut w.trending.subscriber_growth_rate,
            &mut w.trending.recent_engagement_rate,
            &mut w.trending.view_count,
            &mut w.rising_stars.engagement_rate,
            &mut w.rising_stars.follower_growth,
            &mut w.for_you.category_affinity,
            &mut w.for_you.similar_to_followed,
            &mut w.for_you.recency_decay,
            &mut w.for_you.popularity,
        ] {
            *weight = clamp_weight(*weight);
        }

        if !(self.recency_half_life_hours.is_finite() && self.recency_half_life_hours > 0.0) {
            self.recency_half_life_hours = DEFAULT_HALF_LIFE_HOURS;
        }
        self.limit_per_section = self.limit_per_section.max(0);
        self.rising_star_window_days = self.rising_star_window_days.clamp(0, MAX_WINDOW_DAYS);

        if let Some(categories) = self.categories.take() {
            let mut keys: Vec<String> = categories
                .iter()
                .filter_map(|c| crate::models::category_key(c))
                .collect();
            keys.sort();
            keys.dedup();
            self.categories = Some(keys);
        }

        self
    }

    /// Decay constant so that `exp(-lambda * half_life) == 0.5`
    pub fn decay_lambda(&self) -> f64 {
        std::f64::consts::LN_2 / self.recency_half_life_hours
    }

    pub fn limit(&self) -> usize {
        usize::try_from(self.limit_per_section).unwrap_or(0)
    }

    pub fn rising_star_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.rising_star_window_days.clamp(0, MAX_WINDOW_DAYS))
    }
}

/// Whole number from any numeric value, `default` when unusable
fn whole_number_or<'de, D>(deserializer: D, default: i64) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_helpers::number(&value)
        .map(|v| v.floor() as i64)
        .unwrap_or(default))
}

fn limit_or_default<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    whole_number_or(deserializer, DEFAULT_LIMIT_PER_SECTION)
}

fn window_or_default<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    whole_number_or(deserializer, DEFAULT_RISING_STAR_WINDOW_DAYS)
}

fn half_life_or_default<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_helpers::number(&value).unwrap_or(DEFAULT_HALF_LIFE_HOURS))
}

fn clamp_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}
