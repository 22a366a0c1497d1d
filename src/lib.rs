//! CreatorFeed library crate
//!
//! Paywall entitlement resolution and Explore ranking for a creator
//! subscription platform. Re-exports core modules for integration tests and
//! external use.

pub mod api;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod models;
pub mod recommendation;
pub mod serde_helpers;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use entitlement::{resolve, AccessReason, CallToAction, EntitlementResult, EntitlementState};
pub use error::{Error, Result};
pub use models::{CandidatePool, ContentRating, Creator, Post, Viewer, ViewerProfile, Visibility};
pub use recommendation::*;
pub use store::{FixtureStore, PoolFilter, SnapshotStore};
