use crate::domain::money::Balance;
use crate::domain::ports::{EmbeddedBrowser, WalletApi};
use crate::domain::wallet::{
    PageRequest, PaymentLink, RechargeRequest, Statistics, StatisticsPeriod, Transaction,
    WalletBalance,
};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct WalletState {
    balance: Balance,
    transactions: Vec<Transaction>,
    statistics: HashMap<StatisticsPeriod, Statistics>,
    recharges: Vec<RechargeRequest>,
    calls: usize,
    offline: bool,
}

/// A wallet API backed by process memory.
///
/// Uses `Arc<RwLock<_>>` so clones share state; tests keep one handle to seed
/// data or take the service offline while another is owned by the code under test.
#[derive(Clone)]
pub struct InMemoryWalletApi {
    state: Arc<RwLock<WalletState>>,
    payment_base: Arc<str>,
}

impl InMemoryWalletApi {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            payment_base: Arc::from("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html"),
        }
    }

    pub async fn set_balance(&self, balance: Balance) {
        self.state.write().await.balance = balance;
    }

    pub async fn push_transaction(&self, tx: Transaction) {
        self.state.write().await.transactions.push(tx);
    }

    pub async fn set_statistics(&self, period: StatisticsPeriod, statistics: Statistics) {
        self.state.write().await.statistics.insert(period, statistics);
    }

    /// While offline every call fails with a transport error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.write().await.offline = offline;
    }

    /// Recharge requests received so far.
    pub async fn recharges(&self) -> Vec<RechargeRequest> {
        self.state.read().await.recharges.clone()
    }

    /// Number of API calls received, including failed ones.
    pub async fn calls(&self) -> usize {
        self.state.read().await.calls
    }

    async fn begin_call(&self) -> Result<tokio::sync::RwLockWriteGuard<'_, WalletState>> {
        let mut state = self.state.write().await;
        state.calls += 1;
        if state.offline {
            return Err(WalletError::TransportError(
                "wallet service unreachable".to_string(),
            ));
        }
        Ok(state)
    }
}

impl Default for InMemoryWalletApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletApi for InMemoryWalletApi {
    async fn balance(&self) -> Result<WalletBalance> {
        let state = self.begin_call().await?;
        Ok(WalletBalance {
            balance: state.balance,
        })
    }

    async fn transactions(&self, page: PageRequest) -> Result<Vec<Transaction>> {
        let state = self.begin_call().await?;
        let limit = page.limit as usize;
        let skip = page.page.saturating_sub(1) as usize * limit;
        Ok(state
            .transactions
            .iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn statistics(&self, period: StatisticsPeriod) -> Result<Statistics> {
        let state = self.begin_call().await?;
        Ok(state.statistics.get(&period).cloned().unwrap_or_default())
    }

    async fn recharge(&self, request: RechargeRequest) -> Result<PaymentLink> {
        let mut state = self.begin_call().await?;
        let payment_url = format!(
            "{}?vnp_Amount={}&vnp_TxnRef=MEM{}",
            self.payment_base,
            request.amount.value() * 100,
            state.recharges.len() + 1
        );
        state.recharges.push(request);
        Ok(PaymentLink { payment_url })
    }
}

#[derive(Debug, Default)]
struct BrowserState {
    loaded: Vec<String>,
    closed: bool,
}

/// An embedded browser stand-in that records what it was asked to do.
#[derive(Default, Clone)]
pub struct InMemoryBrowser {
    state: Arc<RwLock<BrowserState>>,
}

impl InMemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn loaded(&self) -> Vec<String> {
        self.state.read().await.loaded.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}

#[async_trait]
impl EmbeddedBrowser for InMemoryBrowser {
    async fn load(&self, url: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.loaded.push(url.to_string());
        state.closed = false;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.write().await.closed = true;
        Ok(())
    }
}
