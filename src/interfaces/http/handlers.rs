use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Redirect;
use url::Url;

use super::AppState;
use super::dto::{
    CreatePaymentRequest, CreatePaymentResponse, TransactionList, TransactionSummary,
    VerifyPaymentRequest,
};
use crate::application::orchestrator::{CreatePayment, VerifyOutcome};
use crate::domain::transaction::{Amount, TransactionFilter, TransactionStats};
use crate::error::{PaymentError, Result};

pub const API_KEY_HEADER: &str = "x-api-key";

fn api_key(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|key| !key.is_empty())
        .ok_or(PaymentError::InvalidCredential)
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PaymentError::InvalidRequest(rejection.body_text()))
}

// ---------------------------------------------------------------------------
// POST /payments/create
// ---------------------------------------------------------------------------

pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>> {
    let api_key = api_key(&headers)?;
    let request = body(payload)?;

    if request.payer_contact.trim().is_empty() {
        return Err(PaymentError::InvalidRequest(
            "payer contact is required".to_string(),
        ));
    }
    let callback_url = Url::parse(&request.callback_url)
        .map_err(|e| PaymentError::InvalidRequest(format!("callback_url: {e}")))?;

    let created = state
        .orchestrator
        .create_payment(
            api_key,
            CreatePayment {
                amount: Amount::new(request.amount)?,
                payer_contact: request.payer_contact,
                callback_url,
                order_id: request.order_id,
            },
        )
        .await?;

    Ok(Json(CreatePaymentResponse {
        success: true,
        token: created.token,
        payment_url: created.payment_url.into(),
    }))
}

// ---------------------------------------------------------------------------
// GET /payments/process/{token}
// ---------------------------------------------------------------------------

pub async fn process_payment(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Redirect> {
    let target = state.orchestrator.process_payment(&token).await?;
    Ok(Redirect::to(target.as_str()))
}

// ---------------------------------------------------------------------------
// GET /gateway/callback
// ---------------------------------------------------------------------------

/// Landing point for the payer coming back from the gateway. Always redirects.
pub async fn gateway_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Redirect {
    let target = state.orchestrator.gateway_callback(&query).await;
    Redirect::to(target.as_str())
}

// ---------------------------------------------------------------------------
// POST /payments/verify
// ---------------------------------------------------------------------------

pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyOutcome>> {
    let api_key = api_key(&headers)?;
    let request = body(payload)?;
    let outcome = state
        .orchestrator
        .verify_payment(&request.token, api_key)
        .await?;
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// GET /payments/transactions?status=&limit=&offset=
// ---------------------------------------------------------------------------

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    filter: std::result::Result<Query<TransactionFilter>, QueryRejection>,
) -> Result<Json<TransactionList>> {
    let api_key = api_key(&headers)?;
    let Query(filter) =
        filter.map_err(|rejection| PaymentError::InvalidRequest(rejection.body_text()))?;

    let transactions: Vec<TransactionSummary> = state
        .orchestrator
        .list_transactions(api_key, &filter)
        .await?
        .into_iter()
        .map(TransactionSummary::from)
        .collect();

    Ok(Json(TransactionList {
        count: transactions.len(),
        transactions,
    }))
}

// ---------------------------------------------------------------------------
// GET /payments/stats
// ---------------------------------------------------------------------------

pub async fn transaction_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TransactionStats>> {
    let api_key = api_key(&headers)?;
    Ok(Json(state.orchestrator.transaction_stats(api_key).await?))
}

pub async fn health() -> &'static str {
    "ok"
}
