use crate::domain::money::{Balance, RechargeAmount};
use crate::error::{Result, WalletError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Envelope shared by every wallet API response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Unwraps `data`, turning `success: false` or a missing payload into a
    /// transport error.
    pub fn into_data(self) -> Result<T> {
        if !self.success {
            return Err(WalletError::TransportError(
                self.message
                    .unwrap_or_else(|| "wallet API reported failure".to_string()),
            ));
        }
        self.data.ok_or_else(|| {
            WalletError::TransportError("wallet API response has no data".to_string())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct WalletBalance {
    pub balance: Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Recharge,
    Payment,
    Refund,
    Withdraw,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Page request for the transaction history endpoint (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsPeriod {
    Today,
    Week,
    #[default]
    Month,
    Year,
    All,
}

impl StatisticsPeriod {
    pub const ALL: [StatisticsPeriod; 5] = [
        StatisticsPeriod::Today,
        StatisticsPeriod::Week,
        StatisticsPeriod::Month,
        StatisticsPeriod::Year,
        StatisticsPeriod::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsPeriod::Today => "today",
            StatisticsPeriod::Week => "week",
            StatisticsPeriod::Month => "month",
            StatisticsPeriod::Year => "year",
            StatisticsPeriod::All => "all",
        }
    }
}

impl fmt::Display for StatisticsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatisticsPeriod {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        StatisticsPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| WalletError::ValidationError(format!("unknown period '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Statistics {
    pub total_recharge: Decimal,
    pub total_spent: Decimal,
    pub total_refund: Decimal,
    pub transaction_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeRequest {
    pub amount: RechargeAmount,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    pub payment_url: String,
}
