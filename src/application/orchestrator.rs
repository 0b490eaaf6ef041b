use crate::config::ServiceConfig;
use crate::domain::gateway::{CallbackStatus, ChargeRequest, GatewayProviderRef, VerifyResult};
use crate::domain::merchant::{Merchant, mask_api_key};
use crate::domain::ports::{MerchantDirectoryBox, TransactionStoreBox};
use crate::domain::transaction::{
    Amount, NewTransaction, SettleOutcome, Settlement, Transaction, TransactionFilter,
    TransactionStats, TransactionStatus,
};
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use tracing::{error, info, instrument, warn};
use url::Url;

/// A merchant's request to open a payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub amount: Amount,
    pub payer_contact: String,
    pub callback_url: Url,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCreated {
    pub token: String,
    /// Service-hosted URL the payer is sent to; never the upstream URL.
    pub payment_url: Url,
}

/// Normalized answer to a verify call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifyOutcome {
    pub success: bool,
    pub status: TransactionStatus,
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl VerifyOutcome {
    fn from_stored(tx: &Transaction) -> Self {
        Self {
            success: tx.status == TransactionStatus::Completed,
            status: tx.status,
            ref_id: tx.ref_id.clone(),
            message: None,
        }
    }
}

/// Drives the create → redirect → callback → verify protocol.
///
/// `PaymentOrchestrator` owns the storage ports and the resolved gateway.
/// It holds no per-transaction state of its own: every decision is made
/// against the store, so any number of request tasks or processes can share
/// the same backend.
pub struct PaymentOrchestrator {
    merchants: MerchantDirectoryBox,
    transactions: TransactionStoreBox,
    gateway: GatewayProviderRef,
    config: ServiceConfig,
}

impl PaymentOrchestrator {
    /// Creates a new `PaymentOrchestrator`.
    ///
    /// # Arguments
    ///
    /// * `merchants` - Directory used to authenticate API keys.
    /// * `transactions` - The store for payment attempts.
    /// * `gateway` - The upstream gateway resolved at startup.
    /// * `config` - Base URLs and the gateway timeout.
    pub fn new(
        merchants: MerchantDirectoryBox,
        transactions: TransactionStoreBox,
        gateway: GatewayProviderRef,
        config: ServiceConfig,
    ) -> Self {
        Self {
            merchants,
            transactions,
            gateway,
            config,
        }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Opens a charge with the gateway and records it as pending.
    #[instrument(skip(self, api_key, request), fields(gateway = self.gateway.name()))]
    pub async fn create_payment(
        &self,
        api_key: &str,
        request: CreatePayment,
    ) -> Result<PaymentCreated> {
        let merchant = self.authenticate(api_key).await?;

        if !merchant.owns_callback(&request.callback_url) {
            let host = request.callback_url.host_str().unwrap_or_default().to_string();
            warn!(merchant = merchant.id, callback_host = %host, "Callback URL does not match merchant domain");
            return Err(PaymentError::CallbackMismatch(host));
        }

        let charge = ChargeRequest {
            amount: request.amount,
            return_url: self.service_url(&["gateway", "callback"])?,
            payer_contact: request.payer_contact.clone(),
            order_id: request.order_id.clone(),
            description: match &request.order_id {
                Some(order_id) => format!("Payment for order {order_id}"),
                None => format!("Payment to {}", merchant.name),
            },
        };

        let result = self
            .bounded("create_charge", self.gateway.create_charge(&charge))
            .await?;

        let (token, redirect_url) = match (result.success, result.token, result.redirect_url) {
            (true, Some(token), Some(url)) => (token, url),
            (true, _, _) => {
                return Err(PaymentError::GatewayUnavailable(
                    "gateway accepted the charge without a token or URL".to_string(),
                ));
            }
            (false, _, _) => {
                let reason = result
                    .reason
                    .unwrap_or_else(|| "gateway refused the charge".to_string());
                warn!(merchant = merchant.id, %reason, "Gateway payment creation failed");
                return Err(PaymentError::GatewayRejected(reason));
            }
        };

        let tx = self
            .transactions
            .insert(NewTransaction {
                merchant_id: merchant.id,
                amount: request.amount,
                payer_contact: request.payer_contact,
                order_id: request.order_id,
                callback_url: request.callback_url,
                gateway_token: token,
                gateway_url: redirect_url,
            })
            .await
            .inspect_err(|e| error!(merchant = merchant.id, error = %e, "Failed to record transaction"))?;

        info!(
            merchant = merchant.id,
            token = %tx.gateway_token,
            amount = %tx.amount.value(),
            "Created payment request"
        );

        Ok(PaymentCreated {
            payment_url: self.service_url(&["payments", "process", &tx.gateway_token])?,
            token: tx.gateway_token,
        })
    }

    /// Returns the upstream URL the payer should be sent to.
    #[instrument(skip(self))]
    pub async fn process_payment(&self, token: &str) -> Result<Url> {
        match self.transactions.get_by_token(token).await? {
            Some(tx) => Ok(tx.gateway_url),
            None => {
                warn!("Invalid payment token attempt");
                Err(PaymentError::TransactionNotFound)
            }
        }
    }

    /// Reads the gateway's callback query and picks the payer's next stop.
    ///
    /// Never fails: anything that cannot be resolved lands on the configured
    /// error page.
    pub async fn gateway_callback(&self, query: &HashMap<String, String>) -> Url {
        match self.gateway.read_callback(query) {
            Some(callback) => {
                self.handle_gateway_callback(&callback.token, callback.status)
                    .await
            }
            None => {
                warn!(gateway = self.gateway.name(), "Unreadable gateway callback");
                self.config.error_redirect_url.clone()
            }
        }
    }

    /// Sends the payer back to the merchant with the token and a coarse status.
    ///
    /// The redirect is advisory; the transaction is left untouched and the
    /// merchant must call verify for the authoritative result.
    #[instrument(skip(self))]
    pub async fn handle_gateway_callback(&self, token: &str, status: CallbackStatus) -> Url {
        let tx = match self.transactions.get_by_token(token).await {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                warn!("Transaction not found for callback");
                return self.config.error_redirect_url.clone();
            }
            Err(e) => {
                error!(error = %e, "Callback lookup failed");
                return self.config.error_redirect_url.clone();
            }
        };

        match status {
            CallbackStatus::Ok => info!(merchant = tx.merchant_id, "Successful payment callback"),
            CallbackStatus::Nok => warn!(merchant = tx.merchant_id, "Failed payment callback"),
        }

        let mut target = tx.callback_url;
        target
            .query_pairs_mut()
            .append_pair("token", token)
            .append_pair("status", status.as_str());
        target
    }

    /// Settles a transaction with the gateway's authoritative answer.
    ///
    /// A transaction that is already terminal reports its stored outcome
    /// without contacting the gateway again.
    #[instrument(skip(self, api_key))]
    pub async fn verify_payment(&self, token: &str, api_key: &str) -> Result<VerifyOutcome> {
        let merchant = self.authenticate(api_key).await?;

        let tx = self.transactions.get_by_token(token).await?.ok_or_else(|| {
            warn!("Invalid token in verify");
            PaymentError::TransactionNotFound
        })?;

        if tx.merchant_id != merchant.id {
            warn!(
                owner = tx.merchant_id,
                caller = merchant.id,
                "Merchant mismatch in verify"
            );
            return Err(PaymentError::OwnershipViolation);
        }

        if tx.status.is_terminal() {
            info!(status = ?tx.status, "Transaction already settled");
            return Ok(VerifyOutcome::from_stored(&tx));
        }

        let result: VerifyResult = self
            .bounded("verify_charge", self.gateway.verify_charge(token, tx.amount))
            .await?;

        // The upstream already settled this charge, most likely on a call whose
        // answer was lost to a timeout. Its final state cannot be read back, so
        // the record stays pending rather than being written as failed.
        if result.already_verified {
            warn!(upstream_ref_id = ?result.ref_id, "Gateway reports the payment as already verified");
            return Ok(VerifyOutcome {
                success: false,
                status: tx.status,
                ref_id: result.ref_id,
                message: result.reason,
            });
        }

        let settlement = match (&result.success, &result.ref_id) {
            (true, Some(ref_id)) => Settlement::Completed {
                ref_id: ref_id.clone(),
            },
            (true, None) => {
                return Err(PaymentError::GatewayUnavailable(
                    "gateway verified the payment without a reference id".to_string(),
                ));
            }
            (false, _) => Settlement::Failed,
        };

        let outcome = self
            .transactions
            .settle(token, settlement)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to settle transaction"))?
            .ok_or(PaymentError::TransactionNotFound)?;

        match outcome {
            SettleOutcome::Applied(tx) => {
                if tx.status == TransactionStatus::Completed {
                    info!(ref_id = ?tx.ref_id, "Payment verified successfully");
                } else {
                    warn!(reason = ?result.reason, "Payment verification failed");
                }
                Ok(VerifyOutcome {
                    message: result.reason,
                    ..VerifyOutcome::from_stored(&tx)
                })
            }
            SettleOutcome::AlreadySettled(tx) => {
                info!(status = ?tx.status, "Concurrent verify settled first");
                Ok(VerifyOutcome::from_stored(&tx))
            }
        }
    }

    /// Lists the caller's own transactions, newest first.
    #[instrument(skip(self, api_key))]
    pub async fn list_transactions(
        &self,
        api_key: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let merchant = self.authenticate(api_key).await?;
        self.transactions.list_for_merchant(merchant.id, filter).await
    }

    #[instrument(skip(self, api_key))]
    pub async fn transaction_stats(&self, api_key: &str) -> Result<TransactionStats> {
        let merchant = self.authenticate(api_key).await?;
        self.transactions.stats_for_merchant(merchant.id).await
    }

    async fn authenticate(&self, api_key: &str) -> Result<Merchant> {
        match self.merchants.find_by_api_key(api_key).await? {
            Some(merchant) if merchant.is_active => Ok(merchant),
            _ => {
                warn!(api_key = %mask_api_key(api_key), "Invalid API key attempt");
                Err(PaymentError::InvalidCredential)
            }
        }
    }

    /// Runs a gateway call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(result) => result.inspect_err(|e| {
                if matches!(e, PaymentError::GatewayUnavailable(_)) {
                    error!(operation, error = %e, "Gateway call failed");
                }
            }),
            Err(_) => {
                error!(operation, timeout = ?self.config.gateway_timeout, "Gateway call timed out");
                Err(PaymentError::GatewayUnavailable(format!(
                    "{operation} timed out after {:?}",
                    self.config.gateway_timeout
                )))
            }
        }
    }

    fn service_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PaymentError::Config("BASE_URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gateway::{ChargeResult, GatewayCallback, GatewayProvider};
    use crate::domain::ports::MerchantDirectory;
    use crate::infrastructure::in_memory::{InMemoryMerchantDirectory, InMemoryTransactionStore};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedGateway;

    #[async_trait]
    impl GatewayProvider for FixedGateway {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn create_charge(&self, _request: &ChargeRequest) -> Result<ChargeResult> {
            Ok(ChargeResult::accepted(
                "T1".to_string(),
                Url::parse("https://gw.example/T1").unwrap(),
            ))
        }

        async fn verify_charge(&self, _token: &str, _amount: Amount) -> Result<VerifyResult> {
            Ok(VerifyResult::verified("R1".to_string()))
        }

        fn read_callback(&self, _query: &HashMap<String, String>) -> Option<GatewayCallback> {
            None
        }
    }

    async fn orchestrator(base_url: &str) -> PaymentOrchestrator {
        let merchants = InMemoryMerchantDirectory::new();
        merchants
            .register(Merchant::new(1, "Shop", "shop.example", "key-1"))
            .await
            .unwrap();
        PaymentOrchestrator::new(
            Box::new(merchants),
            Box::new(InMemoryTransactionStore::new()),
            Arc::new(FixedGateway),
            ServiceConfig {
                base_url: Url::parse(base_url).unwrap(),
                error_redirect_url: Url::parse("https://pay.example.com/error").unwrap(),
                gateway_timeout: Duration::from_secs(1),
            },
        )
    }

    fn request() -> CreatePayment {
        CreatePayment {
            amount: Amount::new(dec!(100.00)).unwrap(),
            payer_contact: "09120000000".to_string(),
            callback_url: Url::parse("https://shop.example/paid").unwrap(),
            order_id: None,
        }
    }

    #[tokio::test]
    async fn test_processing_url_keeps_base_path() {
        let orchestrator = orchestrator("https://pay.example.com/api/").await;
        let created = orchestrator.create_payment("key-1", request()).await.unwrap();
        assert_eq!(
            created.payment_url.as_str(),
            "https://pay.example.com/api/payments/process/T1"
        );
    }

    #[tokio::test]
    async fn test_callback_appends_to_existing_query() {
        let orchestrator = orchestrator("https://pay.example.com").await;
        let mut req = request();
        req.callback_url = Url::parse("https://shop.example/paid?cart=9").unwrap();
        orchestrator.create_payment("key-1", req).await.unwrap();

        let target = orchestrator
            .handle_gateway_callback("T1", CallbackStatus::Nok)
            .await;
        assert_eq!(
            target.as_str(),
            "https://shop.example/paid?cart=9&token=T1&status=NOK"
        );
    }

    #[tokio::test]
    async fn test_unreadable_callback_goes_to_error_page() {
        let orchestrator = orchestrator("https://pay.example.com").await;
        let target = orchestrator.gateway_callback(&HashMap::new()).await;
        assert_eq!(target.as_str(), "https://pay.example.com/error");
    }
}
