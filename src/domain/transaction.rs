use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Maximum number of fractional digits an amount may carry. One toman is ten
/// rials, so a tenth of a toman is the smallest amount a gateway can charge.
pub const AMOUNT_SCALE: u32 = 1;

/// Represents a positive monetary amount for a payment, in toman.
///
/// Ensures that payment amounts are always positive and convert to a whole
/// number of rials.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        if value.normalize().scale() > AMOUNT_SCALE {
            return Err(PaymentError::InvalidRequest(format!(
                "Amount must have at most {AMOUNT_SCALE} decimal places"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Final outcome written onto a pending transaction by a verify call.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    Completed { ref_id: String },
    Failed,
}

impl Settlement {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Settlement::Completed { .. } => TransactionStatus::Completed,
            Settlement::Failed => TransactionStatus::Failed,
        }
    }
}

/// One payment attempt, correlated with the upstream gateway by `gateway_token`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub merchant_id: u64,
    pub amount: Amount,
    pub payer_contact: String,
    pub order_id: Option<String>,
    pub callback_url: Url,
    pub gateway_token: String,
    pub gateway_url: Url,
    pub status: TransactionStatus,
    pub ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a fresh pending transaction.
    pub fn pending(new: NewTransaction) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            merchant_id: new.merchant_id,
            amount: new.amount,
            payer_contact: new.payer_contact,
            order_id: new.order_id,
            callback_url: new.callback_url,
            gateway_token: new.gateway_token,
            gateway_url: new.gateway_url,
            status: TransactionStatus::Pending,
            ref_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a settlement if the transaction is still pending.
    ///
    /// Returns `false` and leaves the record untouched when it is already
    /// terminal. Status and reference id are written together.
    pub fn settle(&mut self, settlement: &Settlement) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = settlement.status();
        self.ref_id = match settlement {
            Settlement::Completed { ref_id } => Some(ref_id.clone()),
            Settlement::Failed => None,
        };
        self.updated_at = Utc::now();
        true
    }
}

/// Fields supplied when recording a transaction the gateway has accepted.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub merchant_id: u64,
    pub amount: Amount,
    pub payer_contact: String,
    pub order_id: Option<String>,
    pub callback_url: Url,
    pub gateway_token: String,
    pub gateway_url: Url,
}

/// Result of a conditional settle against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    /// This call performed the transition.
    Applied(Transaction),
    /// Another caller settled first; carries the state it left behind.
    AlreadySettled(Transaction),
}

impl SettleOutcome {
    pub fn into_transaction(self) -> Transaction {
        match self {
            SettleOutcome::Applied(tx) | SettleOutcome::AlreadySettled(tx) => tx,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TransactionFilter {
    pub status: Option<TransactionStatus>,
    /// Merchant-side order reference, matched exactly.
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            status: None,
            order_id: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl TransactionFilter {
    /// Selects one page out of a merchant's transactions, newest first.
    pub fn apply(&self, mut transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions.retain(|tx| {
            self.status.is_none_or(|status| tx.status == status)
                && self
                    .order_id
                    .as_ref()
                    .is_none_or(|order_id| tx.order_id.as_ref() == Some(order_id))
        });
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        transactions
            .into_iter()
            .skip(self.offset)
            .take(self.limit.min(MAX_PAGE_SIZE))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TransactionStats {
    pub total_amount: Decimal,
    pub status_counts: BTreeMap<TransactionStatus, u64>,
}

impl TransactionStats {
    pub fn collect<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut stats = Self::default();
        for tx in transactions {
            *stats.status_counts.entry(tx.status).or_default() += 1;
            if tx.status == TransactionStatus::Completed {
                stats.total_amount += tx.amount.value();
            }
        }
        stats
    }
}
