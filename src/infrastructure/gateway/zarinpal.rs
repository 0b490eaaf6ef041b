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

/// Merchant id Zarinpal accepts on its sandbox.
pub const SANDBOX_MERCHANT_ID: &str = "1344b5d4-0048-11e8-94db-005056a205be";

const CODE_SUCCESS: i64 = 100;
const CODE_ALREADY_VERIFIED: i64 = 101;

/// Endpoint set for one Zarinpal environment.
#[derive(Debug, Clone)]
pub struct ZarinpalEndpoints {
    pub request: String,
    pub start_pay: String,
    pub verify: String,
}

impl ZarinpalEndpoints {
    pub fn for_environment(environment: PaymentEnvironment) -> Self {
        match environment {
            PaymentEnvironment::Sandbox => Self {
                request: "https://sandbox.zarinpal.com/pg/v4/payment/request.json".to_string(),
                start_pay: "https://sandbox.zarinpal.com/pg/StartPay/".to_string(),
                verify: "https://sandbox.zarinpal.com/pg/v4/payment/verify.json".to_string(),
            },
            PaymentEnvironment::Production => Self {
                request: "https://api.zarinpal.com/pg/v4/payment/request.json".to_string(),
                start_pay: "https://www.zarinpal.com/pg/StartPay/".to_string(),
                verify: "https://api.zarinpal.com/pg/v4/payment/verify.json".to_string(),
            },
        }
    }

    /// Points every endpoint at `base`, keeping Zarinpal's path layout.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            request: format!("{base}/pg/v4/payment/request.json"),
            start_pay: format!("{base}/pg/StartPay/"),
            verify: format!("{base}/pg/v4/payment/verify.json"),
        }
    }
}

/// Zarinpal v4 REST integration.
///
/// Amounts are sent in rial. The payer contact travels in `metadata.mobile`.
pub struct ZarinpalProvider {
    client: reqwest::Client,
    merchant_id: String,
    endpoints: ZarinpalEndpoints,
}

impl ZarinpalProvider {
    pub fn new(client: reqwest::Client, merchant_id: String, endpoints: ZarinpalEndpoints) -> Self {
        Self {
            client,
            merchant_id,
            endpoints,
        }
    }

    /// Sandbox falls back to the public sandbox merchant; production requires
    /// `ZARINPAL_MERCHANT_ID`.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let merchant_id = match (config.environment, &config.zarinpal_merchant_id) {
            (_, Some(id)) => id.clone(),
            (PaymentEnvironment::Sandbox, None) => SANDBOX_MERCHANT_ID.to_string(),
            (PaymentEnvironment::Production, None) => {
                return Err(PaymentError::Config(
                    "ZARINPAL_MERCHANT_ID must be set in production".to_string(),
                ));
            }
        };
        Ok(Self::new(
            super::http_client(config.timeout)?,
            merchant_id,
            ZarinpalEndpoints::for_environment(config.environment),
        ))
    }
}

#[derive(Debug, Serialize)]
struct PaymentRequestBody<'a> {
    merchant_id: &'a str,
    amount: i64,
    callback_url: &'a str,
    description: &'a str,
    metadata: Metadata<'a>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    mobile: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct VerifyRequestBody<'a> {
    merchant_id: &'a str,
    authority: &'a str,
    amount: i64,
}

/// Zarinpal answers `{data, errors}`; whichever side is unused comes back as
/// an empty array, so both are read loosely.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, Deserialize)]
struct RequestData {
    code: i64,
    authority: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    code: i64,
    #[serde(default)]
    ref_id: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    code: Option<i64>,
    message: Option<String>,
}

impl Envelope {
    fn data<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.data.clone()).ok()
    }

    fn error(&self) -> Option<ErrorData> {
        serde_json::from_value(self.errors.clone()).ok()
    }

    fn failure_reason(&self) -> String {
        let error = self.error();
        let code = error.as_ref().and_then(|e| e.code);
        if let Some(message) = error.and_then(|e| e.message) {
            warn!(?code, %message, "Zarinpal reported an error");
        }
        reason_for(code).to_string()
    }
}

/// Maps a Zarinpal result code onto a failure reason.
pub fn reason_for(code: Option<i64>) -> &'static str {
    match code {
        Some(-9) => "validation error",
        Some(-10) => "terminal is not valid",
        Some(-11) => "terminal is not active",
        Some(-12) => "too many attempts, try again later",
        Some(-15) => "terminal user is suspended",
        Some(-16) => "terminal user level is not valid",
        Some(-17) => "terminal user level is not valid",
        Some(-30) => "terminal does not accept floating wages",
        Some(-31) => "terminal has no default bank account for wages",
        Some(-32) => "wages exceed the maximum amount",
        Some(-33) => "floating wages are not valid",
        Some(-34) => "fixed wages exceed the maximum amount",
        Some(-35) => "floating wages exceed the maximum number of parts",
        Some(-40) => "invalid extra parameters",
        Some(-50) => "paid amount does not match the requested amount",
        Some(-51) => "payment was not successful",
        Some(-52) => "unexpected gateway error",
        Some(-53) => "session does not belong to this merchant",
        Some(-54) => "invalid authority",
        Some(-55) => "payment request not found",
        Some(CODE_ALREADY_VERIFIED) => "payment was already verified",
        _ => UNKNOWN_FAILURE,
    }
}

#[async_trait]
impl GatewayProvider for ZarinpalProvider {
    fn name(&self) -> &'static str {
        "zarinpal"
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult> {
        let body = PaymentRequestBody {
            merchant_id: &self.merchant_id,
            amount: to_rial(request.amount)?,
            callback_url: request.return_url.as_str(),
            description: &request.description,
            metadata: Metadata {
                mobile: &request.payer_contact,
                order_id: request.order_id.as_deref(),
            },
        };

        info!(url = %self.endpoints.request, amount = body.amount, "Payment request to Zarinpal");
        let envelope: Envelope =
            post_json(&self.client, "zarinpal", &self.endpoints.request, &body).await?;

        match envelope.data::<RequestData>() {
            Some(data) if data.code == CODE_SUCCESS => {
                let authority = data.authority.filter(|a| !a.is_empty()).ok_or_else(|| {
                    PaymentError::GatewayUnavailable(
                        "zarinpal accepted the payment without an authority".to_string(),
                    )
                })?;
                let redirect = Url::parse(&format!("{}{}", self.endpoints.start_pay, authority))
                    .map_err(|e| {
                        PaymentError::GatewayUnavailable(format!(
                            "zarinpal authority does not form a URL: {e}"
                        ))
                    })?;
                Ok(ChargeResult::accepted(authority, redirect))
            }
            Some(data) => Ok(ChargeResult::rejected(reason_for(Some(data.code)))),
            None => Ok(ChargeResult::rejected(envelope.failure_reason())),
        }
    }

    async fn verify_charge(&self, token: &str, amount: Amount) -> Result<VerifyResult> {
        let body = VerifyRequestBody {
            merchant_id: &self.merchant_id,
            authority: token,
            amount: to_rial(amount)?,
        };

        info!(authority = token, amount = body.amount, "Payment verification request to Zarinpal");
        let envelope: Envelope =
            post_json(&self.client, "zarinpal", &self.endpoints.verify, &body).await?;

        match envelope.data::<VerifyData>() {
            Some(data) if data.code == CODE_SUCCESS => {
                let ref_id = reference_to_string(&data.ref_id).ok_or_else(|| {
                    PaymentError::GatewayUnavailable(
                        "zarinpal verified the payment without a ref_id".to_string(),
                    )
                })?;
                Ok(VerifyResult::verified(ref_id))
            }
            Some(data) if data.code == CODE_ALREADY_VERIFIED => {
                warn!(authority = token, "Zarinpal reports the payment as already verified");
                Ok(VerifyResult::already_verified(
                    reference_to_string(&data.ref_id),
                    reason_for(Some(data.code)),
                ))
            }
            Some(data) => Ok(VerifyResult::declined(reason_for(Some(data.code)))),
            None => Ok(VerifyResult::declined(envelope.failure_reason())),
        }
    }

    fn read_callback(&self, query: &HashMap<String, String>) -> Option<GatewayCallback> {
        let token = query.get("Authority").filter(|t| !t.is_empty())?;
        let status = match query.get("Status").map(String::as_str) {
            Some("OK") => CallbackStatus::Ok,
            _ => CallbackStatus::Nok,
        };
        Some(GatewayCallback {
            token: token.clone(),
            status,
        })
    }
}
