use crate::domain::merchant::Merchant;
use crate::domain::ports::{MerchantDirectory, TransactionStore};
use crate::domain::transaction::{
    NewTransaction, SettleOutcome, Settlement, Transaction, TransactionFilter, TransactionStats,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory directory of merchants, keyed by API key.
///
/// Ideal for testing or for deployments that seed merchants from a file on
/// every start.
#[derive(Default, Clone)]
pub struct InMemoryMerchantDirectory {
    merchants: Arc<RwLock<HashMap<String, Merchant>>>,
}

impl InMemoryMerchantDirectory {
    /// Creates a new, empty in-memory merchant directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MerchantDirectory for InMemoryMerchantDirectory {
    async fn register(&self, merchant: Merchant) -> Result<()> {
        let mut merchants = self.merchants.write().await;
        if merchants.contains_key(&merchant.api_key) {
            return Err(PaymentError::InvalidRequest(format!(
                "merchant {} reuses an existing API key",
                merchant.id
            )));
        }
        if merchants.values().any(|m| m.domain == merchant.domain) {
            return Err(PaymentError::InvalidRequest(format!(
                "domain {} is already registered",
                merchant.domain
            )));
        }
        merchants.insert(merchant.api_key.clone(), merchant);
        Ok(())
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Merchant>> {
        let merchants = self.merchants.read().await;
        Ok(merchants.get(api_key).cloned())
    }
}

/// A thread-safe in-memory store for transactions, keyed by gateway token.
///
/// Settling happens under a single write lock, so the pending check and the
/// write cannot interleave with another settle on the same token.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transactions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transactions.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, new: NewTransaction) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        if transactions.contains_key(&new.gateway_token) {
            return Err(PaymentError::DuplicateToken(new.gateway_token));
        }
        let tx = Transaction::pending(new);
        transactions.insert(tx.gateway_token.clone(), tx.clone());
        Ok(tx)
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(token).cloned())
    }

    async fn settle(&self, token: &str, settlement: Settlement) -> Result<Option<SettleOutcome>> {
        let mut transactions = self.transactions.write().await;
        let Some(tx) = transactions.get_mut(token) else {
            return Ok(None);
        };
        if tx.settle(&settlement) {
            Ok(Some(SettleOutcome::Applied(tx.clone())))
        } else {
            Ok(Some(SettleOutcome::AlreadySettled(tx.clone())))
        }
    }

    async fn list_for_merchant(
        &self,
        merchant_id: u64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let transactions = self.transactions.read().await;
        let owned = transactions
            .values()
            .filter(|tx| tx.merchant_id == merchant_id)
            .cloned()
            .collect();
        Ok(filter.apply(owned))
    }

    async fn stats_for_merchant(&self, merchant_id: u64) -> Result<TransactionStats> {
        let transactions = self.transactions.read().await;
        Ok(TransactionStats::collect(
            transactions.values().filter(|tx| tx.merchant_id == merchant_id),
        ))
    }
}
