//! End-to-end checks over the public API and the HTTP router, driven by the
//! sample fixture in `fixtures/explore.json`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use creatorfeed::api::{router, start_server, AppState, ServerOptions};
use creatorfeed::{
    rank, resolve, AccessReason, CandidatePool, EntitlementState, FixtureStore, PoolFilter,
    Ranker, RankerOptions, SectionKind, SnapshotStore, Viewer,
};

const FIXTURE: &str = include_str!("../fixtures/explore.json");

fn store() -> FixtureStore {
    FixtureStore::from_json(FIXTURE).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 5, 12, 0, 0).unwrap()
}

fn post<'a>(pool: &'a CandidatePool, id: &str) -> &'a creatorfeed::Post {
    pool.posts.iter().find(|p| p.id == id).unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let state = Arc::new(AppState::new(Ranker::default(), Arc::new(store())));
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn section_ids(body: &Value, index: usize) -> Vec<String> {
    body["sections"][index]["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn paywall_states_for_fixture_viewer() {
    let store = store();
    let pool = store.candidate_pool(&PoolFilter::default()).unwrap();
    let v1 = store.viewer_snapshot("v1").unwrap();

    let subscribed = resolve(&v1, post(&pool, "p1"));
    assert_eq!(subscribed.state, EntitlementState::Unlocked);
    assert_eq!(subscribed.reason, AccessReason::Subscribed);

    let free = resolve(&v1, post(&pool, "p2"));
    assert_eq!(free.reason, AccessReason::Free);

    let other = resolve(&v1, post(&pool, "p3"));
    assert_eq!(other.state, EntitlementState::LockedNoPreview);
    assert_eq!(other.reason, AccessReason::NotSubscribed);

    let anonymous = resolve(&Viewer::Anonymous, post(&pool, "p1"));
    assert_eq!(anonymous.state, EntitlementState::LockedPreview);
    assert_eq!(anonymous.reason, AccessReason::SignInRequired);
}

#[test]
fn ranking_ignores_pool_order() {
    let store = store();
    let pool = store.candidate_pool(&PoolFilter::default()).unwrap();
    let viewer = store.viewer_snapshot("v1").unwrap();
    let options = RankerOptions::default();

    let mut reversed = pool.clone();
    reversed.creators.reverse();
    reversed.posts.reverse();

    let a = rank(&viewer, &pool, &options, now());
    let b = rank(&viewer, &reversed, &options, now());
    assert_eq!(a, b);
}

#[test]
fn nsfw_creator_gated_and_locked_posts_hidden() {
    let store = store();
    let pool = store.candidate_pool(&PoolFilter::default()).unwrap();
    let viewer = store.viewer_snapshot("v1").unwrap();
    let options = RankerOptions {
        hide_fully_locked: true,
        content_rating_gate: true,
        ..Default::default()
    };

    let sections = rank(&viewer, &pool, &options, now());
    assert_eq!(sections[0].kind, SectionKind::Trending);
    assert_eq!(sections[0].ids(), vec!["c1", "c2"]);

    let for_you = sections[2].ids();
    assert!(for_you.contains(&"p1"));
    assert!(for_you.contains(&"p2"));
    assert!(!for_you.contains(&"p3"));
    assert!(!for_you.contains(&"p4"));
}

#[tokio::test]
async fn health_endpoint() {
    let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn resolve_endpoint_returns_call_to_action() {
    let payload = json!({
        "post": {
            "id": "p9",
            "creator_id": "c1",
            "visibility": "premium",
            "thumbnail_url": "https://cdn.example.com/p9.jpg"
        }
    });
    let request = Request::post("/api/v1/entitlements/resolve")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "LOCKED_PREVIEW");
    assert_eq!(body["reason"], "SIGN_IN_REQUIRED");
    assert_eq!(body["call_to_action"]["type"], "sign_in");
}

#[tokio::test]
async fn explore_anonymous_uses_fixture_pool() {
    let (status, body) = send(Request::get("/api/v1/explore").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sections"][0]["kind"]["type"], "trending");
    assert_eq!(body["sections"][1]["kind"]["type"], "rising_stars");
    assert_eq!(body["sections"][2]["kind"]["type"], "for_you");
    assert_eq!(section_ids(&body, 0), vec!["c3", "c1", "c2"]);
    assert!(section_ids(&body, 2).contains(&"p4".to_string()));
}

#[tokio::test]
async fn explore_category_filter() {
    let request = Request::get("/api/v1/explore?viewer_id=v1&category=Cooking")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(section_ids(&body, 0), vec!["c2"]);
}

#[tokio::test]
async fn explore_unknown_viewer_is_not_found() {
    let request = Request::get("/api/v1/explore?viewer_id=ghost")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn rank_endpoint_honours_options() {
    let payload = json!({
        "pool": {
            "creators": [
                {"id": "a", "subscriber_count": null, "metrics": {"recent_engagement_rate": 0.9}},
                {"id": "b", "subscriber_count": 3, "metrics": {"recent_engagement_rate": 0.1}}
            ]
        },
        "options": {"limitPerSection": 1}
    });
    let request = Request::post("/api/v1/explore/rank")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(section_ids(&body, 0), vec!["a"]);
    assert!(section_ids(&body, 2).is_empty());
}

#[tokio::test]
async fn rank_endpoint_gates_nsfw_when_asked() {
    let payload = json!({
        "pool": {
            "creators": [
                {"id": "rated", "content_rating": "sfw"},
                {"id": "unrated"}
            ]
        },
        "options": {"contentRatingGate": true}
    });
    let request = Request::post("/api/v1/explore/rank")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(section_ids(&body, 0), vec!["rated"]);
}

#[tokio::test]
async fn malformed_body_uses_error_shape() {
    let request = Request::post("/api/v1/explore/rank")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"pool": {"creators": ["#))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn resolve_without_post_is_bad_request() {
    let request = Request::post("/api/v1/entitlements/resolve")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"viewer": {"id": "v1"}}"#))
        .unwrap();

    let (status, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn server_returns_once_shutdown_resolves() {
    let state = Arc::new(AppState::new(Ranker::default(), Arc::new(store())));
    let options = ServerOptions {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout: Duration::from_secs(5),
        cors_enabled: false,
    };

    let served = tokio::time::timeout(
        Duration::from_secs(5),
        start_server(state, options, async {}),
    )
    .await;
    assert!(matches!(served, Ok(Ok(()))));
}
