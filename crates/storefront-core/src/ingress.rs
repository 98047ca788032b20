//! Submission ingress
//!
//! HTTP endpoints that customers' browsers post to:
//!
//! - `POST /api/submit-form`: store a form submission as `pending`
//! - `POST /api/subscribe-newsletter`: send the signup emails
//! - `GET /health`
//!
//! Any other method on the form endpoints gets 405 and touches nothing.
//! CORS is fully open, so preflight requests from any origin succeed.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::models::{NewSubmission, Submission};
use crate::notify::{is_valid_email, Newsletter, NotifyError, Subscriber};
use crate::remote::SharedStore;

/// Shared handler state
#[derive(Clone)]
pub struct IngressState {
    pub submissions: SharedStore<Submission>,
    pub newsletter: Arc<Newsletter>,
}

/// Body of a form submission, as sent by the storefront pages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(alias = "form_type")]
    pub form_type: String,
    #[serde(alias = "form_name")]
    pub form_name: String,
    #[serde(default, alias = "customer_name")]
    pub customer_name: Option<String>,
    #[serde(default, alias = "customer_email")]
    pub customer_email: Option<String>,
    #[serde(default, alias = "customer_phone")]
    pub customer_phone: Option<String>,
    #[serde(default, alias = "delivery_address")]
    pub delivery_address: Option<String>,
    #[serde(default, alias = "order_details")]
    pub order_details: Value,
    #[serde(default, alias = "additional_data")]
    pub additional_data: Value,
}

impl SubmissionRequest {
    /// Check required fields and turn the request into an insert payload
    pub fn validate(self) -> Result<NewSubmission, SyncError> {
        let form_type = self.form_type.trim();
        let form_name = self.form_name.trim();
        if form_type.is_empty() {
            return Err(SyncError::ValidationRejected("formType is required".into()));
        }
        if form_name.is_empty() {
            return Err(SyncError::ValidationRejected("formName is required".into()));
        }

        let customer_email = filled(self.customer_email);
        if let Some(ref email) = customer_email {
            if !is_valid_email(email) {
                return Err(SyncError::ValidationRejected(format!(
                    "invalid customer email '{}'",
                    email
                )));
            }
        }

        let mut draft = NewSubmission::new(form_type, form_name);
        draft.customer_name = filled(self.customer_name);
        draft.customer_email = customer_email;
        draft.customer_phone = filled(self.customer_phone);
        draft.delivery_address = filled(self.delivery_address);
        draft.order_details = payload_object(self.order_details, "orderDetails")?;
        draft.additional_data = payload_object(self.additional_data, "additionalData")?;
        Ok(draft)
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Payloads are JSON objects; a missing or null payload is stored as `{}`
fn payload_object(value: Value, field: &str) -> Result<Value, SyncError> {
    match value {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(value),
        _ => Err(SyncError::ValidationRejected(format!(
            "{} must be an object",
            field
        ))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by a handler
#[derive(Debug)]
pub enum ApiError {
    Sync(SyncError),
    Notify(NotifyError),
    BadBody(String),
    MethodNotAllowed,
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        ApiError::Sync(e)
    }
}

impl From<NotifyError> for ApiError {
    fn from(e: NotifyError) -> Self {
        ApiError::Notify(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadBody(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Sync(e) => {
                let status = match e {
                    SyncError::ValidationRejected(_) => StatusCode::BAD_REQUEST,
                    SyncError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    SyncError::NotFound(_) => StatusCode::NOT_FOUND,
                    SyncError::RemoteUnavailable(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.reason().to_string())
            }
            ApiError::Notify(NotifyError::InvalidAddress(addr)) => (
                StatusCode::BAD_REQUEST,
                format!("invalid email address '{}'", addr),
            ),
            ApiError::Notify(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::BadBody(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Build the ingress router
pub fn router(state: IngressState) -> Router {
    Router::new()
        .route(
            "/api/submit-form",
            post(submit_form).fallback(method_not_allowed),
        )
        .route(
            "/api/subscribe-newsletter",
            post(subscribe_newsletter).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until Ctrl-C
pub async fn serve(addr: &str, state: IngressState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Ingress listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down ingress");
        })
        .await
        .context("Ingress server failed")
}

async fn submit_form(
    State(state): State<IngressState>,
    payload: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload?;
    let draft = request.validate()?;

    let created = state.submissions.insert(&draft).await.inspect_err(|e| {
        warn!("Storing {} submission failed: {}", draft.form_type, e);
    })?;

    info!("Stored {} submission {}", created.form_type, created.id);
    Ok(Json(SubmitResponse {
        success: true,
        id: created.id,
    }))
}

async fn subscribe_newsletter(
    State(state): State<IngressState>,
    payload: Result<Json<Subscriber>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, ApiError> {
    let Json(subscriber) = payload?;
    state.newsletter.subscribe(&subscriber).await.inspect_err(|e| {
        warn!("Newsletter signup failed: {}", e);
    })?;

    Ok(Json(SubscribeResponse {
        success: true,
        message: "Subscribed".to_string(),
    }))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::SubmissionStatus;
    use crate::notify::Outbox;
    use crate::remote::{MemoryTable, RemoteStore};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        table: Arc<MemoryTable<Submission>>,
        outbox: Arc<Outbox>,
    }

    fn harness_with(outbox: Outbox) -> Harness {
        let table = Arc::new(MemoryTable::new());
        let outbox = Arc::new(outbox);
        let config = Config {
            operator_email: Some("owner@example.com".to_string()),
            ..Config::default()
        };
        let state = IngressState {
            submissions: table.clone(),
            newsletter: Arc::new(Newsletter::new(outbox.clone(), &config)),
        };
        Harness {
            app: router(state),
            table,
            outbox,
        }
    }

    fn harness() -> Harness {
        harness_with(Outbox::new())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_submit_form_stores_pending_record() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/submit-form",
                json!({
                    "formType": "order",
                    "formName": "Bridal Package",
                    "customerName": "Priya",
                    "customerEmail": "priya@example.com",
                    "orderDetails": {"items": [{"name": "Face Cream", "qty": 2}]},
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["success"], true);

        let rows = h.table.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(body["id"], rows[0].id.as_str());
        assert_eq!(rows[0].status, SubmissionStatus::Pending);
        assert_eq!(rows[0].order_details["items"][0]["qty"], 2);
        assert_eq!(rows[0].additional_data, json!({}));
    }

    #[tokio::test]
    async fn test_submit_form_accepts_snake_case() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/submit-form",
                json!({"form_type": "contact", "form_name": "Contact Us"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.table.len().await, 1);
    }

    #[tokio::test]
    async fn test_non_post_is_rejected_without_write() {
        for method in ["GET", "PUT", "DELETE"] {
            let h = harness();
            let response = h
                .app
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/api/submit-form")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert!(h.table.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_preflight_is_permissive() {
        let h = harness();
        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/submit-form")
                    .header("Origin", "https://shop.example.com")
                    .header("Access-Control-Request-Method", "POST")
                    .header("Access-Control-Request-Headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        assert!(h.table.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_submissions_are_bad_requests() {
        let cases = [
            json!({"formType": "", "formName": "Contact Us"}),
            json!({"formType": "order", "formName": "  "}),
            json!({"formType": "order", "formName": "X", "customerEmail": "nope"}),
            json!({"formName": "missing type"}),
            json!({"formType": "order", "formName": "X", "orderDetails": "2 jars"}),
            json!({"formType": "order", "formName": "X", "additionalData": [1, 2]}),
            json!({"formType": "order", "formName": "X", "orderDetails": 42}),
        ];

        for case in cases {
            let h = harness();
            let response = h
                .app
                .oneshot(post_json("/api/submit-form", case))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(response_json(response).await["error"].is_string());
            assert!(h.table.is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_bad_gateway() {
        let h = harness();
        h.table
            .fail_next(SyncError::RemoteUnavailable("database offline".into()))
            .await;

        let response = h
            .app
            .oneshot(post_json(
                "/api/submit-form",
                json!({"formType": "order", "formName": "X"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(response_json(response).await["error"], "database offline");
    }

    #[tokio::test]
    async fn test_newsletter_sends_two_emails() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json(
                "/api/subscribe-newsletter",
                json!({"email": "priya@example.com", "name": "Priya"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h.outbox.sent().await.len(), 2);
        assert!(h.table.is_empty().await);
    }

    #[tokio::test]
    async fn test_newsletter_errors() {
        let h = harness();
        let response = h
            .app
            .oneshot(post_json("/api/subscribe-newsletter", json!({"email": "bad"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let h = harness_with(Outbox::failing());
        let response = h
            .app
            .oneshot(post_json(
                "/api/subscribe-newsletter",
                json!({"email": "a@b.co"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_newsletter_without_operator_is_server_error() {
        let outbox = Arc::new(Outbox::new());
        let state = IngressState {
            submissions: Arc::new(MemoryTable::<Submission>::new()),
            newsletter: Arc::new(Newsletter::new(outbox.clone(), &Config::default())),
        };

        let response = router(state)
            .oneshot(post_json(
                "/api/subscribe-newsletter",
                json!({"email": "a@b.co"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response_json(response).await["success"], Value::Null);
        assert!(outbox.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let response = h
            .app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
