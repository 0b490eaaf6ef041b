use super::transaction::Amount;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Request to open a charge with an upstream gateway.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount: Amount,
    /// Service-controlled URL the gateway sends the payer back to.
    pub return_url: Url,
    pub payer_contact: String,
    pub order_id: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResult {
    pub success: bool,
    pub token: Option<String>,
    pub redirect_url: Option<Url>,
    pub reason: Option<String>,
}

impl ChargeResult {
    pub fn accepted(token: String, redirect_url: Url) -> Self {
        Self {
            success: true,
            token: Some(token),
            redirect_url: Some(redirect_url),
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            token: None,
            redirect_url: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResult {
    pub success: bool,
    pub ref_id: Option<String>,
    pub reason: Option<String>,
    /// The upstream settled this charge on an earlier call. Not a success, and
    /// not a decline either: the earlier answer may never have reached us.
    pub already_verified: bool,
}

impl VerifyResult {
    pub fn verified(ref_id: String) -> Self {
        Self {
            success: true,
            ref_id: Some(ref_id),
            reason: None,
            already_verified: false,
        }
    }

    pub fn declined(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            ref_id: None,
            reason: Some(reason.into()),
            already_verified: false,
        }
    }

    /// Upstream reports the charge as verified before; `ref_id` is kept when
    /// the gateway echoes it.
    pub fn already_verified(ref_id: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            ref_id,
            reason: Some(reason.into()),
            already_verified: true,
        }
    }
}

/// Coarse payer-side outcome reported on the gateway redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Ok,
    Nok,
}

impl CallbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackStatus::Ok => "OK",
            CallbackStatus::Nok => "NOK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCallback {
    pub token: String,
    pub status: CallbackStatus,
}

/// Capability every upstream payment gateway integration provides.
///
/// Business failures reported by the upstream come back as unsuccessful
/// results. `Err(PaymentError::GatewayUnavailable)` is reserved for transport
/// problems: timeouts, refused connections and bodies that cannot be parsed.
#[async_trait]
pub trait GatewayProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_charge(&self, request: &ChargeRequest) -> Result<ChargeResult>;

    /// Asks the upstream for the final outcome of the charge behind `token`.
    ///
    /// An upstream "already verified" answer comes back through
    /// [`VerifyResult::already_verified`].
    async fn verify_charge(&self, token: &str, amount: Amount) -> Result<VerifyResult>;

    /// Extracts the token and coarse status from the query string the gateway
    /// redirects the payer back with.
    fn read_callback(&self, query: &HashMap<String, String>) -> Option<GatewayCallback>;
}

pub type GatewayProviderRef = Arc<dyn GatewayProvider>;
