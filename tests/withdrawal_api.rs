mod utils;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use utils::create_test_app;

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_post_withdrawal_rejects_nonpositive_amount() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1001",
                "member_type": "individual",
                "asset": "BTC",
                "amount": -10,
                "destination_address": "bc1qexample"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = body_json(response).await;
    assert_eq!(parsed["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_post_withdrawal_rejects_empty_destination() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1001",
                "member_type": "corporate",
                "asset": "ETH",
                "amount": 5000,
                "destination_address": "   "
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_withdrawal_rejects_unknown_member_type() {
    let app = create_test_app();

    let response = app
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1001",
                "member_type": "partnership",
                "asset": "BTC",
                "amount": 5000,
                "destination_address": "bc1qexample"
            }),
        ))
        .await
        .unwrap();

    // Unknown enum variant is rejected at deserialization.
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_withdrawals_rejects_unknown_status_filter() {
    let app = create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/withdrawals?status=not_a_status")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// The tests below need a running Postgres with migrations applied; point
// DATABASE_URL at a throwaway database and run with `--ignored`.

#[tokio::test]
#[ignore]
async fn test_submit_and_fetch_withdrawal() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1001",
                "member_type": "individual",
                "asset": "BTC",
                "amount": 5000,
                "destination_address": "bc1qexample"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    // Individual members skip the corporate approval step.
    assert_eq!(created["status"], "withdrawal_wait");
    assert!(created.get("reference_hash").is_some());

    let id = created["id"].as_str().unwrap();
    let request = Request::builder()
        .method("GET")
        .uri(format!("/withdrawals/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
#[ignore]
async fn test_cancel_only_from_withdrawal_wait() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1002",
                "member_type": "individual",
                "asset": "BTC",
                "amount": 7000,
                "destination_address": "bc1qexample"
            }),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post_json(&format!("/withdrawals/{id}/cancel"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await;
    assert_eq!(cancelled["status"], "withdrawal_stopped");

    // A second cancel hits a terminal row.
    let response = app
        .oneshot(post_json(&format!("/withdrawals/{id}/cancel"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_admin_transition_enforces_table() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1003",
                "member_type": "individual",
                "asset": "ETH",
                "amount": 9000,
                "destination_address": "0xexample"
            }),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    // withdrawal_wait -> success is not in the table.
    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/withdrawals/{id}/status"),
            json!({ "status": "success" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let parsed = body_json(response).await;
    assert_eq!(parsed["code"], "ILLEGAL_TRANSITION");

    // The legal step works.
    let response = app
        .oneshot(post_json(
            &format!("/withdrawals/{id}/status"),
            json!({ "status": "aml_review" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "aml_review");
}

#[tokio::test]
#[ignore]
async fn test_progress_endpoint_projects_status() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/withdrawals",
            json!({
                "member_id": "m-1004",
                "member_type": "individual",
                "asset": "BTC",
                "amount": 3000,
                "destination_address": "bc1qexample"
            }),
        ))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("GET")
        .uri(format!("/withdrawals/{id}/progress"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let progress = body_json(response).await;
    assert_eq!(progress["status"], "withdrawal_wait");
    assert_eq!(progress["label"], "출금 대기");
    assert_eq!(progress["progress"]["percent"], 0);
}
