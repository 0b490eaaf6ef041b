//! Request and response bodies of the merchant-facing API.

use crate::domain::transaction::{Amount, Transaction, TransactionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: Decimal,
    #[serde(alias = "user_phone")]
    pub payer_contact: String,
    pub callback_url: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub token: String,
    pub payment_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "authority")]
    pub token: String,
}

/// What a merchant sees of one of its transactions.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub token: String,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub ref_id: Option<String>,
    pub order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionSummary {
    fn from(tx: Transaction) -> Self {
        Self {
            token: tx.gateway_token,
            amount: tx.amount,
            status: tx.status,
            ref_id: tx.ref_id,
            order_id: tx.order_id,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionList {
    pub count: usize,
    pub transactions: Vec<TransactionSummary>,
}
