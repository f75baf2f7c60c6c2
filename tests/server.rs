use activity_graph::config::Config;
use activity_graph::server::{create_router, AppState};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    create_router(AppState::new(Config::default()))
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    let body = body.to_string();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "activity-graph-rs");
}

#[tokio::test]
async fn test_legend_lists_palette_in_order() {
    let response = app()
        .oneshot(Request::builder().uri("/legend").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 18);
    assert_eq!(entries[0], json!({"label": "Player", "color": "#000000"}));
    assert_eq!(entries[1], json!({"label": "Combat", "color": "#f57e64"}));
}

#[tokio::test]
async fn test_normalize_endpoint_returns_graph_and_stats() {
    let request = post_json(
        "/graph/normalize",
        json!({
            "playerId": "123",
            "record": {
                "players": [
                    {"identity": {"low": 1}, "labels": ["Player"], "properties": {"playerId": "123", "name": "Zezima"}}
                ],
                "events": [
                    {"identity": {"low": 2}, "labels": ["XpGainEvent"], "properties": {"uuid": "x", "eventType": "XP_GAIN", "xpGained": 50, "skill": "Attack"}}
                ],
                "entities": [
                    {"identity": {"low": 3}, "labels": ["Skill"], "properties": {"name": "Attack"}}
                ],
                "relationships": [
                    {"identity": {"low": 4}, "type": "GAINED_XP_IN", "start": {"low": 2}, "end": {"low": 3}}
                ]
            }
        }),
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let nodes = body["data"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[1]["name"], "Gained 50 XP in Attack");

    // One explicit link plus the synthesized actor link.
    assert_eq!(body["data"]["links"].as_array().unwrap().len(), 2);
    assert_eq!(body["stats"]["total_nodes"], 3);
    assert_eq!(body["stats"]["total_edges"], 2);
    assert_eq!(body["stats"]["node_types"]["Skill"], 1);
    assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn test_normalize_rejects_malformed_body() {
    let request = Request::builder()
        .method("POST")
        .uri("/graph/normalize")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request"));
}

#[tokio::test]
async fn test_normalize_empty_record() {
    let response = app()
        .oneshot(post_json("/graph/normalize", json!({"record": {}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"], json!({"nodes": [], "links": []}));
    assert_eq!(body["stats"]["avg_degree"], 0.0);
}

#[tokio::test]
async fn test_body_limit_is_enforced() {
    let config = Config {
        max_body_bytes: 64,
        ..Config::default()
    };
    let app = create_router(AppState::new(config));
    let padding = "x".repeat(256);

    let response = app
        .oneshot(post_json("/graph/normalize", json!({"record": {}, "padding": padding})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
