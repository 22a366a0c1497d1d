//! Ranking metrics and quality monitoring
//!
//! Summaries of a ranked Explore page for logging and dashboards. They are
//! computed by callers after `rank` returns; the ranker itself stays pure.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use super::engine::Section;

/// Summary of a single ranking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSummary {
    pub request_id: String,
    pub viewer_id: Option<String>,
    pub timestamp: i64,

    pub candidates_considered: usize,
    pub sections: usize,
    pub recommendations_returned: usize,
    pub avg_score: f64,
    /// reason -> count
    pub reason_distribution: BTreeMap<String, usize>,
    pub unique_creators: usize,
}

impl RankingSummary {
    pub fn from_sections(
        viewer_id: Option<&str>,
        candidates_considered: usize,
        sections: &[Section],
    ) -> Self {
        let mut reason_distribution = BTreeMap::new();
        let mut creators = BTreeSet::new();
        let mut returned = 0usize;
        let mut score_sum = 0.0f64;

        for candidate in sections.iter().flat_map(|s| s.candidates.iter()) {
            returned += 1;
            score_sum += candidate.score;
            creators.insert(candidate.creator_id.as_str());
            *reason_distribution
                .entry(candidate.reason.to_string())
                .or_insert(0) += 1;
        }

        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            viewer_id: viewer_id.map(str::to_string),
            timestamp: chrono::Utc::now().timestamp(),
            candidates_considered,
            sections: sections.len(),
            recommendations_returned: returned,
            avg_score: if returned == 0 { 0.0 } else { score_sum / returned as f64 },
            reason_distribution,
            unique_creators: creators.len(),
        }
    }

    /// Record counters and histograms for this page
    pub fn record(&self) {
        metrics::counter!("explore_rank_requests_total").increment(1);
        metrics::histogram!("explore_rank_candidates_returned")
            .record(self.recommendations_returned as f64);
        metrics::histogram!("explore_rank_candidates_considered")
            .record(self.candidates_considered as f64);
    }
}

/// Performance timer for tracking operation duration
pub struct PerformanceTimer {
    start: Instant,
    label: &'static str,
}

impl PerformanceTimer {
    pub fn new(label: &'static str) -> Self {
        Self {
            start: Instant::now(),
            label,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn log_if_slow(&self, threshold_ms: u64) {
        let elapsed = self.elapsed_ms();
        if elapsed > threshold_ms {
            tracing::warn!(
                label = self.label,
                elapsed_ms = elapsed,
                threshold_ms,
                "slow operation"
            );
        }
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        tracing::debug!(label = self.label, elapsed_ms = self.elapsed_ms(), "completed");
    }
}

/// Explore page quality checks
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    /// Share of distinct creators among returned candidates (0-1, higher is better)
    pub fn diversity_score(unique_creators: usize, total_recommendations: usize) -> f64 {
        if total_recommendations == 0 {
            return 0.0;
        }
        (unique_creators as f64 / total_recommendations as f64).min(1.0)
    }

    /// Share of candidates picked for a personal reason
    pub fn personalization_score(summary: &RankingSummary) -> f64 {
        if summary.recommendations_returned == 0 {
            return 0.0;
        }
        let personal: usize = ["category_match", "similar_to_followed"]
            .iter()
            .filter_map(|r| summary.reason_distribution.get(*r))
            .sum();
        personal as f64 / summary.recommendations_returned as f64
    }

    /// Detect potential issues with a ranked page
    pub fn detect_issues(summary: &RankingSummary) -> Vec<String> {
        let mut issues = Vec::new();

        if summary.recommendations_returned == 0 {
            if summary.candidates_considered > 0 {
                issues.push("Empty page from a non-empty pool".to_string());
            }
            return issues;
        }

        let diversity =
            Self::diversity_score(summary.unique_creators, summary.recommendations_returned);
        if diversity < 0.2 {
            issues.push(format!("Low diversity: {:.2}", diversity));
        }

        if summary.avg_score < 0.1 {
            issues.push(format!("Low avg score: {:.2}", summary.avg_score));
        }

        issues
    }
}
