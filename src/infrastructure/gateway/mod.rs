//! Upstream payment gateway integrations.
//!
//! Each gateway owns its wire format and its table of result codes; the
//! helpers here cover what they share: the HTTP client, JSON transport and
//! the toman to rial conversion.

pub mod registry;
pub mod zarinpal;
pub mod zibal;

use crate::domain::transaction::Amount;
use crate::error::{PaymentError, Result};
use reqwest::header::ACCEPT;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Reason reported for any result code a gateway table does not know.
pub const UNKNOWN_FAILURE: &str = "payment gateway reported an unknown error";

/// Builds the client every gateway uses; requests are bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PaymentError::Config(format!("failed to build HTTP client: {e}")))
}

/// Posts `body` as JSON and decodes the JSON reply.
///
/// The HTTP status is not inspected: gateways report business errors with
/// 4xx codes and a JSON body, which callers map themselves. Only a failed
/// exchange or an unreadable body is a transport error.
pub(crate) async fn post_json<B, R>(
    client: &reqwest::Client,
    gateway: &str,
    url: &str,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .header(ACCEPT, "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| PaymentError::GatewayUnavailable(format!("{gateway}: {e}")))?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| PaymentError::GatewayUnavailable(format!("{gateway}: {e}")))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        PaymentError::GatewayUnavailable(format!(
            "{gateway} returned an unreadable body (HTTP {status}): {e}"
        ))
    })
}

/// Converts a toman amount into the rial amount gateways expect.
///
/// `Amount` carries at most one fractional digit, so the result is whole.
pub fn to_rial(amount: Amount) -> Result<i64> {
    (amount.value() * dec!(10)).to_i64().ok_or_else(|| {
        PaymentError::InvalidRequest(format!("amount {} is too large", amount.value()))
    })
}

/// Renders a JSON scalar reference id (gateways send numbers or strings).
pub(crate) fn reference_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
