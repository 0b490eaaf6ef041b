use crate::domain::merchant::Merchant;
use crate::domain::ports::{MerchantDirectory, TransactionStore};
use crate::domain::transaction::{
    NewTransaction, SettleOutcome, Settlement, Transaction, TransactionFilter, TransactionStats,
};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for merchant records, keyed by API key.
pub const CF_MERCHANTS: &str = "merchants";
/// Column Family for transactions, keyed by gateway token.
pub const CF_TRANSACTIONS: &str = "transactions";

/// A persistent store implementation using RocksDB.
///
/// Holds both merchants and transactions in separate Column Families. Keying
/// transactions by gateway token gives the token its uniqueness constraint.
///
/// RocksDB allows a single process to open a database, so every
/// read-modify-write goes through `write_lock` and that is enough to make
/// `insert` and `settle` atomic. `Clone` shares the underlying handles.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("merchants" and "transactions") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_merchants = ColumnFamilyDescriptor::new(CF_MERCHANTS, Options::default());
        let cf_transactions = ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_merchants, cf_transactions])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::internal(std::io::Error::other(format!(
                "{name} column family not found"
            )))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(PaymentError::internal),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value).map_err(PaymentError::internal)?;
        self.db.put_cf(cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value).map_err(PaymentError::internal)?);
        }
        Ok(values)
    }

    fn merchant_transactions(&self, merchant_id: u64) -> Result<Vec<Transaction>> {
        let mut all: Vec<Transaction> = self.scan(CF_TRANSACTIONS)?;
        all.retain(|tx| tx.merchant_id == merchant_id);
        Ok(all)
    }
}

#[async_trait]
impl MerchantDirectory for RocksDBStore {
    async fn register(&self, merchant: Merchant) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.read::<Merchant>(CF_MERCHANTS, &merchant.api_key)?.is_some() {
            return Err(PaymentError::InvalidRequest(format!(
                "merchant {} reuses an existing API key",
                merchant.id
            )));
        }
        let existing: Vec<Merchant> = self.scan(CF_MERCHANTS)?;
        if existing.iter().any(|m| m.domain == merchant.domain) {
            return Err(PaymentError::InvalidRequest(format!(
                "domain {} is already registered",
                merchant.domain
            )));
        }
        self.write(CF_MERCHANTS, &merchant.api_key, &merchant)
    }

    async fn find_by_api_key(&self, api_key: &str) -> Result<Option<Merchant>> {
        self.read(CF_MERCHANTS, api_key)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn insert(&self, new: NewTransaction) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        if self
            .read::<Transaction>(CF_TRANSACTIONS, &new.gateway_token)?
            .is_some()
        {
            return Err(PaymentError::DuplicateToken(new.gateway_token));
        }
        let tx = Transaction::pending(new);
        self.write(CF_TRANSACTIONS, &tx.gateway_token, &tx)?;
        Ok(tx)
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, token)
    }

    async fn settle(&self, token: &str, settlement: Settlement) -> Result<Option<SettleOutcome>> {
        let _guard = self.write_lock.lock().await;
        let Some(mut tx) = self.read::<Transaction>(CF_TRANSACTIONS, token)? else {
            return Ok(None);
        };
        if !tx.settle(&settlement) {
            return Ok(Some(SettleOutcome::AlreadySettled(tx)));
        }
        self.write(CF_TRANSACTIONS, token, &tx)?;
        Ok(Some(SettleOutcome::Applied(tx)))
    }

    async fn list_for_merchant(
        &self,
        merchant_id: u64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        Ok(filter.apply(self.merchant_transactions(merchant_id)?))
    }

    async fn stats_for_merchant(&self, merchant_id: u64) -> Result<TransactionStats> {
        Ok(TransactionStats::collect(
            &self.merchant_transactions(merchant_id)?,
        ))
    }
}
