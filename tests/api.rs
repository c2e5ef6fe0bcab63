mod support;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use product_sync::infra::http::{ApiState, REQUEST_ID_HEADER, build_router};

use support::{
    EMPTY_BODY, FailingCache, FakeMedia, FakeRecords, FakeTransport, Harness, SAMPLE_BODY, harness,
};

fn router_with_importer(h: &Harness, records: Arc<FakeRecords>, token: Option<&str>) -> Router {
    let importer = support::importer(h.service.clone(), records, FakeMedia::working());
    let state = ApiState::new(h.service.clone())
        .with_importer(importer)
        .with_admin_token(token.map(str::to_string));
    build_router(state)
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::post(format!("/sync-product-from-amazon/v1{path}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_returns_no_content() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn fetch_product_returns_upstream_document() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    let response = app
        .oneshot(post_json("/fetch-product", json!({"asin": "B08N5WRWNW"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["ItemsResult"]["Items"][0]["ASIN"], "B08N5WRWNW");
}

#[tokio::test]
async fn fetch_product_accepts_identifier_arrays() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    let response = app
        .oneshot(post_json(
            "/fetch-product",
            json!({"asin": ["B08N5WRWNW", "B07XJ8C8F5"], "testConnection": true}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn fetch_product_reports_missing_items() {
    let h = harness(FakeTransport::responding(200, EMPTY_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    let response = app
        .oneshot(post_json("/fetch-product", json!({"asin": "B08N5WRWNW"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body, json!({"status": 500, "message": "No product found."}));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    let request = Request::post("/sync-product-from-amazon/v1/fetch-product")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn import_product_reports_success() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let records = Arc::new(FakeRecords::default());
    let app = router_with_importer(&h, records.clone(), None);

    let response = app
        .oneshot(post_json(
            "/import-product",
            json!({"asin": "B08N5WRWNW", "postStatus": "draft", "postType": "page"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(
        body,
        json!({"status": "success", "message": "Product has been imported successfully."})
    );
    assert_eq!(records.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn import_product_rejects_large_batches() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let records = Arc::new(FakeRecords::default());
    let app = router_with_importer(&h, records.clone(), None);

    let ids = vec!["B08N5WRWNW"; 11].join(",");
    let response = app
        .oneshot(post_json("/import-product", json!({ "asin": ids })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(
        body,
        json!({"status": "error", "message": "You can import maximum 10 products at a time."})
    );
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn import_product_rejects_unknown_status() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = router_with_importer(&h, Arc::new(FakeRecords::default()), None);

    let response = app
        .oneshot(post_json(
            "/import-product",
            json!({"asin": "B08N5WRWNW", "postStatus": "archived"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["status"], "error");
    assert_eq!(h.transport.calls(), 0);
}

#[tokio::test]
async fn import_without_database_is_unavailable() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    let response = app
        .oneshot(post_json("/import-product", json!({"asin": "B08N5WRWNW"})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn admin_token_guards_mutating_routes() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = router_with_importer(&h, Arc::new(FakeRecords::default()), Some("s3cret"));

    let anonymous = app
        .clone()
        .oneshot(post_json("/clear-cache", json!({})))
        .await
        .expect("response");
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let mut wrong = post_json("/clear-cache", json!({}));
    wrong
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer nope".parse().expect("header"));
    let wrong = app.clone().oneshot(wrong).await.expect("response");
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let mut authorized = post_json("/clear-cache", json!({}));
    authorized
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer s3cret".parse().expect("header"));
    let authorized = app.clone().oneshot(authorized).await.expect("response");
    assert_eq!(authorized.status(), StatusCode::OK);

    let lookup = app
        .oneshot(post_json("/fetch-product", json!({"asin": "B08N5WRWNW"})))
        .await
        .expect("response");
    assert_eq!(lookup.status(), StatusCode::OK);
}

#[tokio::test]
async fn clear_cache_empties_the_store() {
    let h = harness(FakeTransport::responding(200, SAMPLE_BODY));
    let app = build_router(ApiState::new(h.service.clone()));

    app.clone()
        .oneshot(post_json("/fetch-product", json!({"asin": "B08N5WRWNW"})))
        .await
        .expect("response");
    assert_eq!(h.cache.len(), 1);

    let response = app
        .oneshot(post_json("/clear-cache", json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"status": "success", "message": "Cache cleared."})
    );
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn clear_cache_failure_is_reported_in_body() {
    let service = support::service_with_cache(
        FakeTransport::responding(200, SAMPLE_BODY),
        Arc::new(FailingCache),
    );
    let app = build_router(ApiState::new(service));

    let response = app
        .oneshot(post_json("/clear-cache", json!({})))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        read_json(response).await,
        json!({"status": "error", "message": "Error: the cache could not be cleared."})
    );
}
