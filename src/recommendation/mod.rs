//! Recommendation Module
//!
//! Ranks creators and posts for the Explore surface.
//!
//! ## Architecture
//!
//! 1. **Options** - Scoring weights and policy switches, tunable per call
//! 2. **Features** - Min-max normalisation, recency decay, popularity
//! 3. **Preferences** - Viewer affinity from profile, history and follows
//! 4. **Engine** - Filters the pool, scores candidates and builds sections
//! 5. **Metrics** - Page summaries and quality checks for monitoring
//!
//! ## Sections
//!
//! - **Trending**: creators by subscriber growth (50%), recent engagement (30%), views (20%)
//! - **Rising Stars**: recently opened creators not already trending, by engagement (60%)
//!   and follower growth (40%)
//! - **For You**: posts by category affinity (40%), similarity to followed creators (30%),
//!   recency (20%) and popularity (10%)
//! - **Category buckets**: the For You formula restricted to one category

pub mod engine;
pub mod features;
pub mod metrics;
pub mod options;
pub mod preferences;

pub use engine::{rank, Candidate, CandidateKind, CandidateReason, Ranker, Section, SectionKind};
pub use options::RankerOptions;
