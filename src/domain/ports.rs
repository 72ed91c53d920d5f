use super::payment::{PaymentOutcome, PaymentReceipt};
use super::wallet::{
    PageRequest, PaymentLink, RechargeRequest, Statistics, StatisticsPeriod, Transaction,
    WalletBalance,
};
use crate::error::Result;
use async_trait::async_trait;

/// Remote wallet service.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn balance(&self) -> Result<WalletBalance>;
    async fn transactions(&self, page: PageRequest) -> Result<Vec<Transaction>>;
    async fn statistics(&self, period: StatisticsPeriod) -> Result<Statistics>;
    async fn recharge(&self, request: RechargeRequest) -> Result<PaymentLink>;
}

/// The embedded browser hosting the gateway checkout page.
///
/// Navigation events flow the other way, through the session's input channel.
#[async_trait]
pub trait EmbeddedBrowser: Send + Sync {
    async fn load(&self, url: &str) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Receives the terminal result of a payment session.
#[async_trait]
pub trait PaymentObserver: Send + Sync {
    async fn on_success(&self, receipt: &PaymentReceipt);
    /// Called for both cancelled and failed outcomes.
    async fn on_failure(&self, outcome: &PaymentOutcome);
}

pub type WalletApiBox = Box<dyn WalletApi>;
pub type EmbeddedBrowserBox = Box<dyn EmbeddedBrowser>;
pub type PaymentObserverBox = Box<dyn PaymentObserver>;
