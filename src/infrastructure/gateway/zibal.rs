use super::{UNKNOWN_FAILURE, post_json, reference_to_string, to_rial};
use crate::config::{GatewayConfig, PaymentEnvironment};
use crate::domain::gateway::{
    CallbackStatus, ChargeRequest, ChargeResult, GatewayCallback, GatewayProvider, VerifyResult,
};
use crate::domain::transaction::Amount;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};
use url::Url;

/// Merchant name Zibal accepts for test payments.
pub const SANDBOX_MERCHANT: &str = "zibal";
pub const DEFAULT_BASE: &str = "https://gateway.zibal.ir";

const RESULT_SUCCESS: i64 = 100;
const RESULT_ALREADY_VERIFIED: i64 = 201;

/// Zibal REST integration.
///
/// Requests carry camelCase fields and a flat `mobile`; the charge token is
/// the numeric `trackId`, kept as a string.
pub struct ZibalProvider {
    client: reqwest::Client,
    merchant: String,
    request_url: String,
    start_url: String,
    verify_url: String,
}

impl ZibalProvider {
    pub fn new(client: reqwest::Client, merchant: String, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            client,
            merchant,
            request_url: format!("{base}/v1/request"),
            start_url: format!("{base}/start/"),
            verify_url: format!("{base}/v1/verify"),
        }
    }

    /// Zibal uses one endpoint set; sandbox only swaps in the test merchant.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let merchant = match (config.environment, &config.zibal_merchant_id) {
            (_, Some(id)) => id.clone(),
            (PaymentEnvironment::Sandbox, None) => SANDBOX_MERCHANT.to_string(),
            (PaymentEnvironment::Production, None) => {
                return Err(PaymentError::Config(
                    "ZIBAL_MERCHANT_ID must be set in production".to_string(),
                ));
            }
        };
        Ok(Self::new(
            super::http_client(config.timeout)?,
            merchant,
            DEFAULT_BASE,
        ))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    merchant: &'a str,
    amount: i64,
    callback_url: &'a str,
    description: &'a str,
    mobile: &'a str,
    order_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody<'a> {
    merchant: &'a str,
    track_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestReply {
    result: i64,
    #[serde(default)]
    track_id: Value,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReply {
    result: i64,
    #[serde(default)]
    ref_number: Value,
    amount: Option<i64>,
    message: Option<String>,
}

/// Maps a Zibal result code onto a failure reason.
pub fn reason_for(code: i64) -> &'static str {
    match code {
        102 => "merchant not found",
        103 => "merchant is inactive",
        104 => "merchant is invalid",
        105 => "amount must be at least 1,000 rials",
        106 => "callback URL is invalid",
        113 => "amount exceeds the transaction limit",
        RESULT_ALREADY_VERIFIED => "payment was already verified",
        202 => "order was not paid or the payment failed",
        203 => "trackId is invalid",
        -1 => "validation error",
        -2 => "internal gateway error",
        -3 => "duplicate deposit key",
        -4 => "merchant id not found",
        -5 => "merchant is inactive",
        -6 => "submitted data could not be verified",
        -7 => "transaction is locked",
        -8 => "transaction not found",
        -9 => "operation not allowed for this transaction",
        -10 => "transaction amount is invalid",
        -11 => "transaction amount is out of the permitted range",
        -12 => "insufficient balance",
        -13 => "operation failed",
        _ => UNKNOWN_FAILURE,
    }
}

#[async_trait]
impl GatewayProvider for ZibalProvider {
    fn name(&self) -> &'static str {
        "zibal"
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        let body = RequestBody {
            merchant: &self.merchant,
            amount: to_rial(request.amount)?,
            callback_url: request.return_url.as_str(),
            description: &request.description,
            mobile: &request.payer_contact,
            order_id: request.order_id.as_deref(),
        };

        info!(url = %self.request_url, amount = body.amount, "Payment request to Zibal");
        let reply: RequestReply = post_json(&self.client, "zibal", &self.request_url, &body).await?;

        if reply.result != RESULT_SUCCESS {
            warn!(result = reply.result, message = ?reply.message, "Zibal rejected payment request");
            return Ok(ChargeResult::rejected(reason_for(reply.result)));
        }

        let track_id = reference_to_string(&reply.track_id).ok_or_else(|| {
            PaymentError::GatewayUnavailable(
                "zibal accepted the payment without a trackId".to_string(),
            )
        })?;
        let redirect = Url::parse(&format!("{}{}", self.start_url, track_id)).map_err(|e| {
            PaymentError::GatewayUnavailable(format!("zibal trackId does not form a URL: {e}"))
        })?;
        Ok(ChargeResult::accepted(track_id, redirect))
    }

    async fn verify_charge(&self, token: &str, amount: Amount) -> Result<VerifyResult> {
        let expected = to_rial(amount)?;
        let body = VerifyBody {
            merchant: &self.merchant,
            track_id: token,
        };

        info!(track_id = token, amount = expected, "Payment verification request to Zibal");
        let reply: VerifyReply = post_json(&self.client, "zibal", &self.verify_url, &body).await?;

        if reply.result == RESULT_ALREADY_VERIFIED {
            warn!(track_id = token, "Zibal reports the payment as already verified");
            return Ok(VerifyResult::already_verified(
                reference_to_string(&reply.ref_number),
                reason_for(reply.result),
            ));
        }
        if reply.result != RESULT_SUCCESS {
            warn!(result = reply.result, message = ?reply.message, "Zibal declined verification");
            return Ok(VerifyResult::declined(reason_for(reply.result)));
        }
        if let Some(paid) = reply.amount
            && paid != expected
        {
            warn!(track_id = token, paid, expected, "Zibal verified a different amount");
            return Ok(VerifyResult::declined(
                "paid amount does not match the requested amount",
            ));
        }

        let ref_number = reference_to_string(&reply.ref_number).ok_or_else(|| {
            PaymentError::GatewayUnavailable(
                "zibal verified the payment without a refNumber".to_string(),
            )
        })?;
        Ok(VerifyResult::verified(ref_number))
    }

    fn read_callback(&self, query: &HashMap<String, String>) -> Option<GatewayCallback> {
        let token = query.get("trackId").filter(|t| !t.is_empty())?;
        let status = match query.get("success").map(String::as_str) {
            Some("1") => CallbackStatus::Ok,
            _ => CallbackStatus::Nok,
        };
        Some(GatewayCallback {
            token: token.clone(),
            status,
        })
    }
}
