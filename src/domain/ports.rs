use super::merchant::Merchant;
use super::transaction::{
    NewTransaction, SettleOutcome, Settlement, Transaction, TransactionFilter, TransactionStats,
};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait MerchantDirectory: Send + Sync {
    /// Adds a merchant; rejects a duplicate API key or domain.
    async fn register(&self, merchant: Merchant) -> Result<()>;
    /// Looks up a merchant by API key, active or not.
    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Merchant>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Records a new pending transaction. Fails with `DuplicateToken` if the
    /// gateway token is already present.
    async fn insert(&self, tx: NewTransaction) -> Result<Transaction>;
    async fn get_by_token(&self, token: &str) -> Result<Option<Transaction>>;
    /// Atomically settles the transaction only if it is still pending.
    ///
    /// Returns `None` if the token is unknown.
    async fn settle(&self, token: &str, settlement: Settlement) -> Result<Option<SettleOutcome>>;
    async fn list_for_merchant(
        &self,
        merchant_id: u64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>>;
    async fn stats_for_merchant(&self, merchant_id: u64) -> Result<TransactionStats>;
}

pub type MerchantDirectoryBox = Box<dyn MerchantDirectory>;
pub type TransactionStoreBox = Box<dyn TransactionStore>;
