//! Scoring features
//!
//! Turns raw creator/post signals into comparable [0, 1] values. Metrics are
//! min-max scaled over the pool being ranked rather than against global
//! constants, so scores stay comparable within one call while absolute
//! numbers drift. Missing or non-finite inputs contribute 0.

use chrono::{DateTime, Utc};

use crate::models::Post;

/// Views are a weaker signal than likes or comments
const VIEW_POPULARITY_FACTOR: f64 = 0.1;

/// Drop NaN and infinities so they count as missing
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Observed range of one metric across a candidate pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRange {
    pub min: f64,
    pub max: f64,
}

impl MetricRange {
    /// Range over the present values, `None` when nothing is present
    pub fn over<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        values
            .into_iter()
            .filter_map(finite)
            .fold(None, |range, v| match range {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }

    /// Min-max scale into [0, 1]. A flat range scales everything to 0.
    pub fn normalize(&self, value: Option<f64>) -> f64 {
        let Some(v) = finite(value) else {
            return 0.0;
        };
        let span = self.max - self.min;
        if span <= 0.0 || !span.is_finite() {
            return 0.0;
        }
        ((v - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Min-max normalize a column of values in one go
#[cfg(test)]
fn normalize_all(values: &[Option<f64>]) -> Vec<f64> {
    match MetricRange::over(values.iter().copied()) {
        Some(range) => values.iter().map(|v| range.normalize(*v)).collect(),
        None => vec![0.0; values.len()],
    }
}

/// Hours between `at` and `now`; timestamps in the future count as age 0
pub fn age_hours(at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - at).num_seconds().max(0);
    seconds as f64 / 3600.0
}

/// Exponential decay `exp(-lambda * age_hours)`; 0 without a timestamp
pub fn recency_decay(at: Option<DateTime<Utc>>, now: DateTime<Utc>, lambda: f64) -> f64 {
    match at {
        Some(at) => {
            let decay = (-lambda * age_hours(at, now)).exp();
            if decay.is_finite() {
                decay.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
        None => 0.0,
    }
}

/// Raw engagement of a post: likes + comments + a tenth of views.
/// `None` when the post reports no counters at all.
pub fn post_popularity(post: &Post) -> Option<f64> {
    if post.likes.is_none() && post.comments.is_none() && post.views.is_none() {
        return None;
    }
    let likes = post.likes.unwrap_or(0) as f64;
    let comments = post.comments.unwrap_or(0) as f64;
    let views = post.views.unwrap_or(0) as f64;
    Some(likes + comments + views * VIEW_POPULARITY_FACTOR)
}

/// True if `created_at` falls inside `window` ending at `now`
pub fn is_within_window(
    created_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> bool {
    match created_at {
        Some(at) => at >= now - window,
        None => false,
    }
}
