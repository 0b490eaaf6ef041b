#![allow(dead_code)]

use async_trait::async_trait;
use gateway_proxy::application::orchestrator::{CreatePayment, PaymentOrchestrator};
use gateway_proxy::config::ServiceConfig;
use gateway_proxy::domain::gateway::{
    CallbackStatus, ChargeRequest, ChargeResult, GatewayCallback, GatewayProvider, VerifyResult,
};
use gateway_proxy::domain::merchant::Merchant;
use gateway_proxy::domain::ports::MerchantDirectory;
use gateway_proxy::domain::transaction::Amount;
use gateway_proxy::error::{PaymentError, Result};
use gateway_proxy::infrastructure::in_memory::{InMemoryMerchantDirectory, InMemoryTransactionStore};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const SHOP_KEY: &str = "shop-key-0001";
pub const OTHER_KEY: &str = "other-key-0002";
pub const CLOSED_KEY: &str = "closed-key-0003";

pub const BASE_URL: &str = "https://pay.example.com";
pub const ERROR_URL: &str = "https://pay.example.com/error";

#[derive(Debug, Clone)]
pub enum VerifyReply {
    /// Succeeds with `R<n>`, `n` being the 1-based verify call count.
    Verified,
    Declined(String),
    /// Upstream settled the charge on an earlier call, echoing this ref id.
    AlreadyVerified(Option<String>),
    Unavailable,
}

struct Script {
    reject_charges: Mutex<Option<String>>,
    verify: Mutex<VerifyReply>,
    delay: Mutex<Duration>,
    charges: AtomicUsize,
    verifies: AtomicUsize,
}

/// In-process gateway whose replies are set by the test.
///
/// Charges are accepted with tokens `T1`, `T2`, ... and redirect to
/// `https://gw.example/<token>`. Callbacks are read from `token` and
/// `status=OK|NOK` query parameters.
#[derive(Clone)]
pub struct ScriptedGateway {
    script: Arc<Script>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script {
                reject_charges: Mutex::new(None),
                verify: Mutex::new(VerifyReply::Verified),
                delay: Mutex::new(Duration::ZERO),
                charges: AtomicUsize::new(0),
                verifies: AtomicUsize::new(0),
            }),
        }
    }

    pub fn reject_charges(&self, reason: &str) {
        *self.script.reject_charges.lock().unwrap() = Some(reason.to_string());
    }

    pub fn verify_with(&self, reply: VerifyReply) {
        *self.script.verify.lock().unwrap() = reply;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.script.delay.lock().unwrap() = delay;
    }

    pub fn charge_calls(&self) -> usize {
        self.script.charges.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.script.verifies.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.script.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl GatewayProvider for ScriptedGateway {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn create_charge(&self, _request: &ChargeRequest) -> Result<ChargeResult> {
        let n = self.script.charges.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        if let Some(reason) = self.script.reject_charges.lock().unwrap().clone() {
            return Ok(ChargeResult::rejected(reason));
        }
        let token = format!("T{n}");
        let url = Url::parse(&format!("https://gw.example/{token}")).unwrap();
        Ok(ChargeResult::accepted(token, url))
    }

    async fn verify_charge(&self, _token: &str, _amount: Amount) -> Result<VerifyResult> {
        let n = self.script.verifies.fetch_add(1, Ordering::SeqCst) + 1;
        self.pause().await;
        let reply = self.script.verify.lock().unwrap().clone();
        match reply {
            VerifyReply::Verified => Ok(VerifyResult::verified(format!("R{n}"))),
            VerifyReply::Declined(reason) => Ok(VerifyResult::declined(reason)),
            VerifyReply::AlreadyVerified(ref_id) => Ok(VerifyResult::already_verified(
                ref_id,
                "payment was already verified",
            )),
            VerifyReply::Unavailable => Err(PaymentError::GatewayUnavailable(
                "connection refused".to_string(),
            )),
        }
    }

    fn read_callback(&self, query: &HashMap<String, String>) -> Option<GatewayCallback> {
        let token = query.get("token")?.clone();
        let status = match query.get("status").map(String::as_str) {
            Some("OK") => CallbackStatus::Ok,
            _ => CallbackStatus::Nok,
        };
        Some(GatewayCallback { token, status })
    }
}

pub struct Harness {
    pub orchestrator: Arc<PaymentOrchestrator>,
    pub transactions: InMemoryTransactionStore,
    pub gateway: ScriptedGateway,
}

/// Builds an orchestrator over in-memory stores seeded with three merchants:
/// `shop.example`, `other.example` and the inactive `closed.example`.
pub async fn build(
    gateway: ScriptedGateway,
    timeout: Duration,
) -> (PaymentOrchestrator, InMemoryTransactionStore) {
    let merchants = InMemoryMerchantDirectory::new();
    merchants
        .register(Merchant::new(1, "Shop", "shop.example", SHOP_KEY))
        .await
        .unwrap();
    merchants
        .register(Merchant::new(2, "Other", "other.example", OTHER_KEY))
        .await
        .unwrap();
    let mut closed = Merchant::new(3, "Closed", "closed.example", CLOSED_KEY);
    closed.is_active = false;
    merchants.register(closed).await.unwrap();

    let transactions = InMemoryTransactionStore::new();
    let orchestrator = PaymentOrchestrator::new(
        Box::new(merchants),
        Box::new(transactions.clone()),
        Arc::new(gateway),
        ServiceConfig {
            base_url: Url::parse(BASE_URL).unwrap(),
            error_redirect_url: Url::parse(ERROR_URL).unwrap(),
            gateway_timeout: timeout,
        },
    );
    (orchestrator, transactions)
}

pub async fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(5)).await
}

pub async fn harness_with_timeout(timeout: Duration) -> Harness {
    let gateway = ScriptedGateway::new();
    let (orchestrator, transactions) = build(gateway.clone(), timeout).await;
    Harness {
        orchestrator: Arc::new(orchestrator),
        transactions,
        gateway,
    }
}

pub fn payment(amount: Decimal, callback_url: &str) -> CreatePayment {
    CreatePayment {
        amount: Amount::new(amount).unwrap(),
        payer_contact: "09120000000".to_string(),
        callback_url: Url::parse(callback_url).unwrap(),
        order_id: None,
    }
}
