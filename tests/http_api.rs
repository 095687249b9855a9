use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use splitpay::handlers;
use splitpay::record::PaymentLinkBase;
use splitpay::service::SplitService;
use splitpay::store::{MemoryStore, SplitRecordStore};

const BASE_URL: &str = "https://split.example.com";

fn app_with_store(memory: MemoryStore) -> Router {
    let service = SplitService::new(
        SplitRecordStore::new(memory),
        PaymentLinkBase::new(BASE_URL.parse().unwrap()),
    );
    handlers::routes().with_state(Arc::new(service))
}

fn app() -> Router {
    app_with_store(MemoryStore::new())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/split")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_create_equal_split() {
    let (status, body) = send(
        app(),
        post_json(json!({ "totalAmount": 100, "peopleCount": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let data = &body["data"];
    assert_eq!(data["splitAmount"], json!(25.0));
    assert_eq!(data["currency"], json!("ETH"));
    let id = data["requestId"].as_str().unwrap();
    assert_eq!(id.len(), 22);
    assert_eq!(
        data["paymentLink"],
        json!(format!("{BASE_URL}/pay/{id}"))
    );
    assert!(data["createdAt"].is_string());
    assert!(data.get("details").is_none());
}

#[tokio::test]
async fn test_create_accepts_numeric_strings() {
    let (status, body) = send(
        app(),
        post_json(json!({
            "totalAmount": "120 ETH",
            "peopleCount": "3",
            "splitMode": "tip",
            "tipPercentage": "10",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let split_amount = body["data"]["splitAmount"].as_f64().unwrap();
    assert!((split_amount - 44.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let (status, body) = send(app(), post_json(json!({ "totalAmount": 100 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("Total amount and people count are required")
    );

    let (status, body) = send(
        app(),
        post_json(json!({ "totalAmount": "", "peopleCount": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("Total amount and people count are required")
    );
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() {
    let (status, body) = send(
        app(),
        post_json(json!({ "totalAmount": -5, "peopleCount": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid total amount"));

    let (status, body) = send(
        app(),
        post_json(json!({ "totalAmount": 10, "peopleCount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid people count"));
}

#[tokio::test]
async fn test_overflowing_split_is_rejected_and_not_stored() {
    let memory = MemoryStore::new();
    let (status, body) = send(
        app_with_store(memory.clone()),
        post_json(json!({
            "totalAmount": 1e308,
            "peopleCount": 1,
            "splitMode": "tip",
            "tipPercentage": 100,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Amount out of range"));
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_percentage_shares_must_sum_to_hundred() {
    let memory = MemoryStore::new();
    let (status, body) = send(
        app_with_store(memory.clone()),
        post_json(json!({
            "totalAmount": 100,
            "peopleCount": 3,
            "splitMode": "percentage",
            "shares": [50, 30, 17],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Shares must add up to 100"));
    assert_eq!(body["sum"], json!(97.0));
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_unknown_split_mode_is_rejected() {
    let (status, body) = send(
        app(),
        post_json(json!({ "totalAmount": 10, "peopleCount": 2, "splitMode": "weighted" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Unknown split mode: weighted"));
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/split")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid request body"));
}

#[tokio::test]
async fn test_created_split_can_be_fetched() {
    let app = app();
    let (status, created) = send(
        app.clone(),
        post_json(json!({
            "totalAmount": 90,
            "peopleCount": 3,
            "splitMode": "percentage",
            "shares": [50, 30, 20],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["data"]["details"], json!([45.0, 27.0, 18.0]));
    let id = created["data"]["requestId"].as_str().unwrap().to_string();

    let (status, fetched) = send(app, get(&format!("/api/split/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let data = &fetched["data"];
    assert_eq!(data["id"], json!(id));
    assert_eq!(data["totalAmount"], json!(90.0));
    assert_eq!(data["peopleCount"], json!(3));
    assert_eq!(data["splitMode"], json!("percentage"));
    assert_eq!(data["details"], json!([45.0, 27.0, 18.0]));
    assert_eq!(data["createdAt"], created["data"]["createdAt"]);
    assert_eq!(data["paymentLink"], created["data"]["paymentLink"]);
    assert_eq!(data["displayAmount"], json!("30.0000"));
}

#[tokio::test]
async fn test_unknown_split_is_not_found() {
    let (status, body) = send(app(), get("/api/split/doesNotExist123")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Split not found"));

    let (status, _) = send(app(), get("/api/split/not-an-id")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_split_info_lists_modes() {
    let (status, body) = send(app(), get("/api/split")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], json!("/api/split"));
    assert_eq!(
        body["body"]["splitMode"],
        json!(["equal", "percentage", "custom", "tip"])
    );
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}
