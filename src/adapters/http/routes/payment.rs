//! Payment webhook and checkout endpoints.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::use_cases::billing::EventDisposition,
    application::use_cases::checkout::StartCheckoutInput,
    domain::entities::capability::Capability,
};

/// POST /api/v1/payment/webhook
///
/// Consumes the raw body bytes: signature verification must run over the
/// payload exactly as received, before any parsing.
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    let event = app_state.webhook_verifier.verify(&body, signature)?;

    let disposition = match app_state.billing_use_cases.process_event(&event).await {
        Ok(disposition) => disposition,
        Err(error) => {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                retryable = error.is_retryable(),
                %error,
                "webhook processing failed"
            );
            return Err(error);
        }
    };

    match disposition {
        EventDisposition::Duplicate => {
            debug!(event_id = %event.id, "duplicate webhook delivery acknowledged");
        }
        EventDisposition::Processed(outcome) => {
            info!(
                event_id = %event.id,
                event_type = %event.event_type,
                %outcome,
                "webhook event processed"
            );
        }
    }

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    company_id: Uuid,
    price_id: String,
    success_url: String,
    cancel_url: String,
    trial_days: Option<i32>,
}

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    session_id: String,
    url: Option<String>,
}

/// POST /api/v1/payment/checkout
async fn start_checkout(
    State(app_state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<impl IntoResponse> {
    let session = app_state
        .checkout_use_cases
        .start_checkout(&StartCheckoutInput {
            company_id: request.company_id,
            price_id: request.price_id,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
            trial_days: request.trial_days,
        })
        .await?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

#[derive(Debug, Deserialize)]
struct PortalRequest {
    company_id: Uuid,
    return_url: String,
}

#[derive(Debug, Serialize)]
struct PortalResponse {
    url: String,
}

/// POST /api/v1/payment/portal
async fn open_portal(
    State(app_state): State<AppState>,
    Json(request): Json<PortalRequest>,
) -> AppResult<impl IntoResponse> {
    let session = app_state
        .checkout_use_cases
        .open_billing_portal(request.company_id, &request.return_url)
        .await?;

    Ok(Json(PortalResponse { url: session.url }))
}

#[derive(Debug, Deserialize)]
struct EntitlementQuery {
    capability: Capability,
    /// When present, the member's own status and permissions are checked on
    /// top of the company subscription gate.
    user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct EntitlementResponse {
    entitled: bool,
}

/// GET /api/v1/payment/entitlement/{company_id}
///
/// Synchronous entitlement check consumed by the other service modules on
/// their hot paths. Pure read; never touches subscription state.
async fn check_entitlement(
    State(app_state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Query(query): Query<EntitlementQuery>,
) -> AppResult<impl IntoResponse> {
    let entitled = match query.user_id {
        Some(user_id) => {
            app_state
                .entitlement_use_cases
                .member_may(company_id, user_id, query.capability)
                .await?
        }
        None => {
            app_state
                .entitlement_use_cases
                .is_entitled(company_id, query.capability)
                .await?
        }
    };

    Ok(Json(EntitlementResponse { entitled }))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/checkout", post(start_checkout))
        .route("/portal", post(open_portal))
        .route("/entitlement/{company_id}", get(check_entitlement))
}
