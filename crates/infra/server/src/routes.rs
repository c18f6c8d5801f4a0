//! HTTP routes for the OTP API.

use axum::extract::{ConnectInfo, State};
use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use otp_gate_core::{OtpChannel, OtpError, RequestParts};
use otp_gate_service::{OtpService, SendOtp};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

const REMAINING_PHONE_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining-phone");
const REMAINING_IP_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining-ip");

/// Shared state for OTP routes.
#[derive(Clone)]
pub struct AppState {
    service: Arc<OtpService>,
}

/// Creates the OTP API router.
pub fn otp_routes(service: Arc<OtpService>) -> Router {
    Router::new()
        .route("/otp/send", post(send_handler))
        .route("/otp/verify", post(verify_handler))
        .route("/otp/rate-limit/reset", post(reset_handler))
        .route("/health", get(health_handler))
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    phone: String,
    #[serde(default)]
    preferred_channels: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    request_id: String,
    channel: OtpChannel,
    ttl_seconds: u64,
    phone: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    phone: String,
    request_id: String,
    otp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    verified: bool,
    message: &'static str,
    remaining_attempts: u32,
    phone: String,
    verified_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ResetRequest {
    phone: String,
}

/// Builds request metadata from the transport peer and proxy headers.
fn request_parts(peer: SocketAddr, headers: &HeaderMap) -> RequestParts {
    let mut parts = RequestParts::new().with_peer_addr(peer.ip().to_string());
    for name in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            parts = parts.with_header(name, value);
        }
    }
    parts
}

async fn send_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<SendRequest>,
) -> Result<Response, ApiError> {
    let parts = request_parts(peer, &headers);
    let client_ip = parts.client_ip();

    let send = SendOtp {
        phone: request.phone,
        preferred_channels: request.preferred_channels,
    };
    let outcome = state.service.send(send, client_ip.as_deref()).await?;

    let body = SendResponse {
        request_id: outcome.request_id,
        channel: outcome.channel,
        ttl_seconds: outcome.ttl_seconds,
        phone: outcome.masked_phone,
    };

    let mut response = (StatusCode::OK, Json(body)).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(
        REMAINING_PHONE_HEADER,
        header_number(outcome.remaining_phone),
    );
    if let Some(remaining_ip) = outcome.remaining_ip {
        response_headers.insert(REMAINING_IP_HEADER, header_number(remaining_ip));
    }
    Ok(response)
}

async fn verify_handler(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let outcome = state
        .service
        .verify(&request.phone, &request.request_id, &request.otp)
        .await?;

    Ok(Json(VerifyResponse {
        verified: true,
        message: "OTP verified successfully",
        remaining_attempts: 0,
        phone: outcome.phone,
        verified_at: outcome.verified_at,
    }))
}

async fn reset_handler(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let phone = state.service.reset_rate_limit(&request.phone).await?;
    Ok(Json(json!({ "phone": phone, "reset": true })))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn header_number(value: u32) -> HeaderValue {
    HeaderValue::from_str(&value.to_string()).unwrap_or(HeaderValue::from_static("0"))
}

/// HTTP wrapper over [`OtpError`].
pub struct ApiError(OtpError);

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Internal details stay in the logs, not the response.
        let message = if self.0.is_user_error() {
            self.0.to_string()
        } else {
            tracing::error!(error = %self.0, "internal error");
            "Internal server error".to_string()
        };

        let mut body = json!({ "message": message });
        match &self.0 {
            OtpError::InvalidCode { remaining_attempts } => {
                body["verified"] = json!(false);
                body["remainingAttempts"] = json!(remaining_attempts);
            }
            OtpError::Expired | OtpError::MaxAttemptsExceeded | OtpError::NotFound => {
                body["verified"] = json!(false);
                body["remainingAttempts"] = json!(0);
            }
            OtpError::RateLimitExceeded {
                retry_after_seconds,
            } => {
                body["retryAfterSeconds"] = json!(retry_after_seconds);
            }
            _ => {}
        }

        let mut response = (status, Json(body)).into_response();
        if let OtpError::RateLimitExceeded {
            retry_after_seconds,
        } = self.0
        {
            if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
