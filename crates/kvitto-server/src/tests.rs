//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use async_trait::async_trait;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tower::ServiceExt;

use kvitto_core::{LineItem, MockBackend, RawAmount, Receipt, ReceiptStore};

const SECRET: &str = "test-secret";
const RECEIPT_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";
const BOUNDARY: &str = "kvitto-test-boundary";

/// In-memory store that records how often it was consulted.
struct MockStore {
    receipt: Option<Receipt>,
    calls: AtomicUsize,
}

impl MockStore {
    fn new(receipt: Option<Receipt>) -> Arc<Self> {
        Arc::new(Self {
            receipt,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceiptStore for MockStore {
    async fn fetch_receipt(&self, id: &str, owner: &str) -> kvitto_core::Result<Option<Receipt>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .receipt
            .clone()
            .filter(|r| r.id == id && r.user_id == owner))
    }
}

/// Model backend that captures the submitted bytes.
struct CapturingModel {
    submitted: Mutex<Vec<u8>>,
    response: String,
}

#[async_trait]
impl ModelBackend for CapturingModel {
    async fn parse_receipt(
        &self,
        image: &[u8],
        _mime_type: &str,
    ) -> kvitto_core::Result<serde_json::Value> {
        *self.submitted.lock().unwrap() = image.to_vec();
        kvitto_core::ai::parsing::parse_model_json(&self.response)
    }

    fn model(&self) -> &str {
        "capturing"
    }
}

fn test_receipt() -> Receipt {
    Receipt {
        id: RECEIPT_ID.to_string(),
        user_id: "U1".to_string(),
        merchant: Some("Cafe".to_string()),
        purchase_date: Some("2024-03-05T10:00:00Z".to_string()),
        total: Some(RawAmount::Number(12.5)),
        currency: Some("EUR".to_string()),
        category: Some("Food & Drink".to_string()),
        items: vec![
            LineItem {
                name: "Espresso".to_string(),
                quantity: Some(2.0),
                price: Some(RawAmount::Number(3.5)),
            },
            LineItem {
                name: "Croissant".to_string(),
                quantity: Some(1.0),
                price: Some(RawAmount::Number(5.5)),
            },
        ],
    }
}

fn make_app(
    store: Option<Arc<dyn ReceiptStore>>,
    model: Option<Arc<dyn ModelBackend>>,
    jwt_secret: Option<&str>,
) -> Router {
    create_router(AppState {
        config: ServerConfig::default(),
        store,
        model,
        jwt_secret: jwt_secret.map(|s| s.to_string()),
    })
}

fn make_token(sub: &str, secret: &str) -> String {
    let claims = serde_json::json!({
        "sub": sub,
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Build a multipart body with one file part.
fn file_part_body(bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"receipt.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
            BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn analyze_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/analyze-receipt")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ========== Root ==========

#[tokio::test]
async fn test_hello_world() {
    let app = make_app(None, None, None);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["hello"], "world");
}

// ========== Analysis ==========

#[tokio::test]
async fn test_analyze_no_file_part() {
    let model: Arc<dyn ModelBackend> = Arc::new(MockBackend::new("{}"));
    let app = make_app(None, Some(model), None);

    // A text-only form has no file to analyze.
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let response = app
        .oneshot(analyze_request(body.into_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().starts_with("No file provided"));
}

#[tokio::test]
async fn test_analyze_empty_form() {
    let model: Arc<dyn ModelBackend> = Arc::new(MockBackend::new("{}"));
    let app = make_app(None, Some(model), None);

    let body = format!("--{}--\r\n", BOUNDARY);
    let response = app
        .oneshot(analyze_request(body.into_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_without_model_configured() {
    let app = make_app(None, None, None);

    let response = app
        .oneshot(analyze_request(file_part_body(b"fake image bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_analyze_returns_parsed_json_verbatim() {
    let raw = r#"```json
{"merchant": "Cafe", "date": "2024-03-05", "total": 12.5, "currency": "EUR",
 "items": [{"name": "Espresso", "quantity": 2, "price": 3.5}],
 "category": "Food & Drink"}
```"#;
    let model: Arc<dyn ModelBackend> = Arc::new(MockBackend::new(raw));
    let app = make_app(None, Some(model), None);

    let response = app
        .oneshot(analyze_request(file_part_body(b"fake image bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["merchant"], "Cafe");
    assert_eq!(json["total"], 12.5);
    assert_eq!(json["items"][0]["name"], "Espresso");
    assert_eq!(json["category"], "Food & Drink");
}

#[tokio::test]
async fn test_analyze_model_returns_prose() {
    let model: Arc<dyn ModelBackend> =
        Arc::new(MockBackend::new("I could not read this receipt, sorry!"));
    let app = make_app(None, Some(model), None);

    let response = app
        .oneshot(analyze_request(file_part_body(b"fake image bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = get_body_json(response).await;
    // The raw model text is surfaced for prompt debugging.
    assert_eq!(json["raw"], "I could not read this receipt, sorry!");
}

#[tokio::test]
async fn test_analyze_model_returns_broken_json() {
    let model: Arc<dyn ModelBackend> = Arc::new(MockBackend::new("{\"merchant\": "));
    let app = make_app(None, Some(model), None);

    let response = app
        .oneshot(analyze_request(file_part_body(b"fake image bytes")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = get_body_json(response).await;
    assert_eq!(json["raw"], "{\"merchant\": ");
}

#[tokio::test]
async fn test_analyze_upload_too_large() {
    let model: Arc<dyn ModelBackend> = Arc::new(MockBackend::new("{}"));
    let app = create_router(AppState {
        config: ServerConfig {
            allowed_origins: vec![],
            max_upload_size: 8,
        },
        store: None,
        model: Some(model),
        jwt_secret: None,
    });

    let response = app
        .oneshot(analyze_request(file_part_body(
            b"well over eight bytes of image data",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_analyze_consumes_first_file_part_only() {
    let capturing = Arc::new(CapturingModel {
        submitted: Mutex::new(Vec::new()),
        response: "{}".to_string(),
    });
    let app = make_app(None, Some(capturing.clone()), None);

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nfirst\r\n--{b}\r\nContent-Disposition: form-data; name=\"file2\"; filename=\"b.jpg\"\r\nContent-Type: image/jpeg\r\n\r\nsecond\r\n--{b}--\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );

    let response = app.oneshot(analyze_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*capturing.submitted.lock().unwrap(), b"first".to_vec());
}

// ========== Export ==========

#[tokio::test]
async fn test_export_without_token() {
    let store = MockStore::new(Some(test_receipt()));
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    // Rejected before the store is ever consulted.
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_export_wrong_auth_scheme() {
    let store = MockStore::new(Some(test_receipt()));
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header("authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_export_invalid_token() {
    let store = MockStore::new(Some(test_receipt()));
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header("authorization", "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_export_without_secret_configured() {
    let store = MockStore::new(Some(test_receipt()));
    let app = make_app(Some(store.clone()), None, None);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U1", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Operator error, not a caller error.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_export_bad_id() {
    let store = MockStore::new(Some(test_receipt()));
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/receipts/not-a-valid-id/export/csv")
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U1", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_export_not_owned_is_not_found() {
    let store = MockStore::new(Some(test_receipt())); // owned by U1
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U2", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Not 403: ownership misses look exactly like missing records.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_export_unknown_id_is_not_found() {
    let store = MockStore::new(None);
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U1", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_csv_document() {
    let store = MockStore::new(Some(test_receipt()));
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U1", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap(),
        format!("attachment; filename=receipt_{}.csv", RECEIPT_ID)
    );

    let body = get_body_text(response).await;
    assert!(body.starts_with("Merchant,Cafe\n"));
    assert!(body.contains("\nTotal,12.50\n"));

    // Exactly two data rows under the Items header.
    let lines: Vec<&str> = body.split('\n').collect();
    let items_at = lines.iter().position(|l| *l == "Items").unwrap();
    assert_eq!(lines[items_at + 1], "Name,Quantity,Price");
    assert_eq!(
        lines[items_at + 2..].to_vec(),
        vec!["Espresso,2,3.50", "Croissant,1,5.50"]
    );
}

#[tokio::test]
async fn test_export_csv_no_items() {
    let mut receipt = test_receipt();
    receipt.items.clear();
    let store = MockStore::new(Some(receipt));
    let app = make_app(Some(store.clone()), None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U1", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = get_body_text(response).await;
    // Header rows survive an empty item list; no data rows follow.
    assert!(body.ends_with("Items\nName,Quantity,Price"));
}

#[tokio::test]
async fn test_export_without_store_configured() {
    let app = make_app(None, None, Some(SECRET));

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/receipts/{}/export/csv", RECEIPT_ID))
                .header(
                    "authorization",
                    format!("Bearer {}", make_token("U1", SECRET)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
