mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{OTHER_KEY, SHOP_KEY, ScriptedGateway, VerifyReply};
use gateway_proxy::interfaces::http::{AppState, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn app() -> (Router, ScriptedGateway) {
    let gateway = ScriptedGateway::new();
    let (orchestrator, _) = common::build(gateway.clone(), Duration::from_secs(5)).await;
    (create_router(Arc::new(AppState { orchestrator })), gateway)
}

fn post_json(uri: &str, api_key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

async fn create(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/payments/create",
            Some(SHOP_KEY),
            json!({
                "amount": "100.00",
                "user_phone": "09120000000",
                "callback_url": "https://shop.example/paid",
                "order_id": "ord-7"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app().await;
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_full_payment_flow() {
    let (app, _) = app().await;

    let created = create(&app).await;
    assert_eq!(created["success"], true);
    assert_eq!(created["token"], "T1");
    assert_eq!(
        created["payment_url"],
        "https://pay.example.com/payments/process/T1"
    );

    let response = app
        .clone()
        .oneshot(get("/payments/process/T1", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "https://gw.example/T1");

    let response = app
        .clone()
        .oneshot(get("/gateway/callback?token=T1&status=OK", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://shop.example/paid?token=T1&status=OK"
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/payments/verify",
            Some(SHOP_KEY),
            json!({ "authority": "T1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let verified = json_body(response).await;
    assert_eq!(verified["success"], true);
    assert_eq!(verified["status"], "completed");
    assert_eq!(verified["ref_id"], "R1");

    let response = app
        .clone()
        .oneshot(get("/payments/transactions?status=completed", Some(SHOP_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = json_body(response).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["transactions"][0]["token"], "T1");
    assert_eq!(list["transactions"][0]["order_id"], "ord-7");

    let response = app
        .clone()
        .oneshot(get("/payments/transactions?order_id=ord-7", Some(SHOP_KEY)))
        .await
        .unwrap();
    let list = json_body(response).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["transactions"][0]["token"], "T1");

    let response = app
        .clone()
        .oneshot(get("/payments/transactions?order_id=ord-8", Some(SHOP_KEY)))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["count"], 0);

    let response = app
        .oneshot(get("/payments/stats", Some(SHOP_KEY)))
        .await
        .unwrap();
    let stats = json_body(response).await;
    assert_eq!(stats["status_counts"]["completed"], 1);
}

#[tokio::test]
async fn test_declined_verify_reports_failure() {
    let (app, gateway) = app().await;
    gateway.verify_with(VerifyReply::Declined("Payment was canceled".to_string()));
    create(&app).await;

    let response = app
        .oneshot(post_json(
            "/payments/verify",
            Some(SHOP_KEY),
            json!({ "token": "T1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["ref_id"], Value::Null);
}

#[tokio::test]
async fn test_error_responses() {
    let (app, _) = app().await;
    create(&app).await;

    let cases = [
        (
            post_json(
                "/payments/create",
                None,
                json!({"amount": 10, "payer_contact": "0912", "callback_url": "https://shop.example/cb"}),
            ),
            StatusCode::UNAUTHORIZED,
            "invalid_credential",
        ),
        (
            post_json(
                "/payments/create",
                Some(SHOP_KEY),
                json!({"amount": 10, "payer_contact": "0912", "callback_url": "https://evil.example/cb"}),
            ),
            StatusCode::BAD_REQUEST,
            "callback_mismatch",
        ),
        (
            post_json(
                "/payments/create",
                Some(SHOP_KEY),
                json!({"amount": -5, "payer_contact": "0912", "callback_url": "https://shop.example/cb"}),
            ),
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
        (
            post_json(
                "/payments/create",
                Some(SHOP_KEY),
                json!({"amount": "10.05", "payer_contact": "0912", "callback_url": "https://shop.example/cb"}),
            ),
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
        (
            post_json("/payments/create", Some(SHOP_KEY), json!({"amount": 10})),
            StatusCode::BAD_REQUEST,
            "invalid_request",
        ),
        (
            get("/payments/process/unknown", None),
            StatusCode::NOT_FOUND,
            "transaction_not_found",
        ),
        (
            post_json("/payments/verify", Some(OTHER_KEY), json!({"token": "T1"})),
            StatusCode::FORBIDDEN,
            "ownership_violation",
        ),
    ];

    for (request, status, kind) in cases {
        let uri = request.uri().to_string();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), status, "{uri}");
        let body = json_body(response).await;
        assert_eq!(body["error"], kind, "{uri}");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn test_bad_callback_goes_to_error_page() {
    let (app, _) = app().await;
    let response = app
        .oneshot(get("/gateway/callback?token=nope&status=OK", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "https://pay.example.com/error");
}
