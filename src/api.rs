//! HTTP API Server for entitlements and Explore ranking
//!
//! A thin JSON surface over the library. Handlers fetch snapshots, call the
//! pure resolver/ranker and serialize the result; no decision logic lives here.

use axum::{
    extract::{FromRequest, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::entitlement::{resolve, EntitlementResult};
use crate::error::{Error, Result};
use crate::models::{CandidatePool, Post, Viewer, ViewerProfile};
use crate::recommendation::metrics::{PerformanceTimer, QualityAnalyzer, RankingSummary};
use crate::recommendation::{Ranker, RankerOptions, Section};
use crate::store::{PoolFilter, SnapshotStore};

/// Shared application state
pub struct AppState {
    pub ranker: Ranker,
    pub store: Arc<dyn SnapshotStore>,
}

impl AppState {
    pub fn new(ranker: Ranker, store: Arc<dyn SnapshotStore>) -> Self {
        Self { ranker, store }
    }
}

/// Server options taken from `ApiConfig`
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub cors_enabled: bool,
}

/// JSON body extractor; rejected bodies answer with the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Request body for resolving one post
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub viewer: Option<ViewerProfile>,
    pub post: Post,
}

/// Request body for ranking a caller-supplied snapshot
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub viewer: Option<ViewerProfile>,
    #[serde(default)]
    pub pool: CandidatePool,
    #[serde(default)]
    pub options: Option<RankerOptions>,
}

/// Query params for the Explore endpoint
#[derive(Debug, Deserialize)]
pub struct ExploreQuery {
    pub viewer_id: Option<String>,
    pub category: Option<String>,
}

/// Response for ranking endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ExploreResponse {
    pub sections: Vec<Section>,
    pub generated_at: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Paywall
        .route("/api/v1/entitlements/resolve", post(resolve_entitlement))
        // Explore
        .route("/api/v1/explore", get(explore))
        .route("/api/v1/explore/rank", post(rank_snapshot))
        .with_state(state)
}

/// Start the API server and serve until `shutdown` resolves. In-flight
/// requests are drained before this returns.
pub async fn start_server<F>(
    state: Arc<AppState>,
    options: ServerOptions,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut app = router(state)
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(TraceLayer::new_for_http());

    if options.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting explore API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Explore API server stopped");

    Ok(())
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Resolve what a viewer may see of a post
async fn resolve_entitlement(ApiJson(req): ApiJson<ResolveRequest>) -> Json<EntitlementResult> {
    let viewer = Viewer::from(req.viewer);
    let result = resolve(&viewer, &req.post);

    metrics::counter!("entitlement_resolutions_total").increment(1);
    debug!(
        viewer = viewer.id().unwrap_or("anonymous"),
        post = %req.post.id,
        state = ?result.state,
        "Resolved entitlement"
    );

    Json(result)
}

/// Rank a snapshot supplied in the request body
async fn rank_snapshot(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RankRequest>,
) -> Json<ExploreResponse> {
    let viewer = Viewer::from(req.viewer);
    let ranker = match req.options {
        Some(options) => Ranker::new(options),
        None => state.ranker.clone(),
    };

    Json(rank_page(&ranker, &viewer, &req.pool))
}

/// Rank the store's pool for a stored viewer (or anonymously)
async fn explore(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<ExploreResponse>> {
    let viewer = match query.viewer_id.as_deref() {
        Some(id) if !id.trim().is_empty() => state.store.viewer_snapshot(id.trim())?,
        _ => Viewer::Anonymous,
    };

    let filter = PoolFilter {
        category: query.category,
        ..Default::default()
    };
    let pool = state.store.candidate_pool(&filter)?;

    Ok(Json(rank_page(&state.ranker, &viewer, &pool)))
}

fn rank_page(ranker: &Ranker, viewer: &Viewer, pool: &CandidatePool) -> ExploreResponse {
    let timer = PerformanceTimer::new("rank_explore");
    let generated_at = Utc::now();
    let sections = ranker.rank(viewer, pool, generated_at);
    timer.log_if_slow(100);

    let summary = RankingSummary::from_sections(
        viewer.id(),
        pool.creators.len() + pool.posts.len(),
        &sections,
    );
    summary.record();
    for issue in QualityAnalyzer::detect_issues(&summary) {
        warn!(request_id = %summary.request_id, "Explore quality issue: {}", issue);
    }

    ExploreResponse {
        sections,
        generated_at,
    }
}
