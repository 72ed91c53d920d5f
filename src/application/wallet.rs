use crate::config::{TRANSACTION_PAGE_SIZE, WalletConfig};
use crate::domain::money::{Balance, RechargeAmount};
use crate::domain::payment::{PaymentOutcome, PaymentOutcomeResolver, ResponseCodeTable};
use crate::domain::ports::WalletApiBox;
use crate::domain::wallet::{
    PageRequest, RechargeRequest, Statistics, StatisticsPeriod, Transaction,
};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// A recharge that has a checkout URL and is waiting for the gateway.
#[derive(Debug)]
pub struct PendingPayment {
    pub amount: RechargeAmount,
    pub payment_url: String,
    pub resolver: PaymentOutcomeResolver,
}

/// The wallet as the rider sees it: cached balance, history and statistics.
///
/// Failed refreshes leave the cached values untouched, so a flaky connection
/// shows stale data rather than an empty wallet.
pub struct WalletService {
    api: WalletApiBox,
    config: WalletConfig,
    table: Arc<ResponseCodeTable>,
    balance: Option<Balance>,
    transactions: Vec<Transaction>,
    next_page: u32,
    has_more: bool,
    statistics: HashMap<StatisticsPeriod, Statistics>,
    period: StatisticsPeriod,
}

impl WalletService {
    pub fn new(api: WalletApiBox, config: WalletConfig) -> Self {
        Self::with_response_codes(api, config, Arc::new(ResponseCodeTable::vnpay()))
    }

    pub fn with_response_codes(
        api: WalletApiBox,
        config: WalletConfig,
        table: Arc<ResponseCodeTable>,
    ) -> Self {
        Self {
            api,
            config,
            table,
            balance: None,
            transactions: Vec::new(),
            next_page: 1,
            has_more: true,
            statistics: HashMap::new(),
            period: StatisticsPeriod::default(),
        }
    }

    pub fn balance(&self) -> Option<Balance> {
        self.balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn has_more_transactions(&self) -> bool {
        self.has_more
    }

    pub fn period(&self) -> StatisticsPeriod {
        self.period
    }

    pub fn statistics(&self, period: StatisticsPeriod) -> Option<&Statistics> {
        self.statistics.get(&period)
    }

    pub async fn refresh_balance(&mut self) -> Result<Balance> {
        match self.api.balance().await {
            Ok(wallet) => {
                self.balance = Some(wallet.balance);
                Ok(wallet.balance)
            }
            Err(e) => {
                tracing::warn!(error = %e, "balance refresh failed, keeping cached value");
                Err(e)
            }
        }
    }

    /// Replaces the history with its first page.
    pub async fn reload_transactions(&mut self) -> Result<&[Transaction]> {
        let page = PageRequest {
            page: 1,
            limit: TRANSACTION_PAGE_SIZE,
        };
        match self.api.transactions(page).await {
            Ok(items) => {
                self.has_more = items.len() >= TRANSACTION_PAGE_SIZE as usize;
                self.next_page = 2;
                self.transactions = items;
                Ok(&self.transactions)
            }
            Err(e) => {
                tracing::warn!(error = %e, "transaction reload failed, keeping cached history");
                Err(e)
            }
        }
    }

    /// Appends the next page; returns how many transactions were added.
    ///
    /// Once a short page has been seen this is a no-op.
    pub async fn load_more_transactions(&mut self) -> Result<usize> {
        if !self.has_more {
            return Ok(0);
        }

        let page = PageRequest {
            page: self.next_page,
            limit: TRANSACTION_PAGE_SIZE,
        };
        match self.api.transactions(page).await {
            Ok(items) => {
                let added = items.len();
                self.has_more = added >= TRANSACTION_PAGE_SIZE as usize;
                self.next_page += 1;
                self.transactions.extend(items);
                Ok(added)
            }
            Err(e) => {
                tracing::warn!(error = %e, page = page.page, "loading more transactions failed");
                Err(e)
            }
        }
    }

    /// Fetches statistics for `period` and makes it the current period.
    ///
    /// On failure the current period and any cached figures stay as they were.
    pub async fn load_statistics(&mut self, period: StatisticsPeriod) -> Result<&Statistics> {
        match self.api.statistics(period).await {
            Ok(statistics) => {
                self.period = period;
                self.statistics.insert(period, statistics);
                Ok(&self.statistics[&period])
            }
            Err(e) => {
                tracing::warn!(error = %e, %period, "statistics refresh failed");
                Err(e)
            }
        }
    }

    /// Refreshes balance, history and the current statistics period.
    ///
    /// Every part is attempted; the first error (if any) is returned.
    pub async fn reload(&mut self) -> Result<()> {
        let balance = self.refresh_balance().await.map(|_| ());
        let transactions = self.reload_transactions().await.map(|_| ());
        let statistics = self.load_statistics(self.period).await.map(|_| ());
        balance.and(transactions).and(statistics)
    }

    /// Validates `input` and asks the wallet API for a checkout URL.
    ///
    /// Invalid amounts are rejected before any request is made.
    #[tracing::instrument(skip(self))]
    pub async fn start_recharge(&self, input: &str) -> Result<PendingPayment> {
        let amount = RechargeAmount::parse(input)?;

        let link = self
            .api
            .recharge(RechargeRequest {
                amount,
                return_url: self.config.return_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
            })
            .await?;

        tracing::info!(amount = amount.value(), "recharge started");

        Ok(PendingPayment {
            amount,
            payment_url: link.payment_url,
            resolver: PaymentOutcomeResolver::new(
                self.config.gateway.clone(),
                Arc::clone(&self.table),
            ),
        })
    }

    /// Reloads wallet data after a payment attempt ends, whatever the outcome.
    pub async fn finish_payment(&mut self, outcome: &PaymentOutcome) -> Result<()> {
        match outcome {
            PaymentOutcome::Success(receipt) => {
                tracing::info!(txn_ref = %receipt.txn_ref, amount = %receipt.amount(), "recharge paid")
            }
            other => tracing::info!(outcome = %other, "recharge not completed"),
        }
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wallet::{TransactionStatus, TransactionType};
    use crate::error::WalletError;
    use crate::infrastructure::in_memory::InMemoryWalletApi;
    use rust_decimal_macros::dec;

    fn tx(id: usize) -> Transaction {
        Transaction {
            id: format!("tx-{id}"),
            r#type: TransactionType::Recharge,
            amount: dec!(50000),
            status: TransactionStatus::Completed,
            description: None,
            created_at: None,
        }
    }

    fn service(api: &InMemoryWalletApi) -> WalletService {
        WalletService::new(Box::new(api.clone()), WalletConfig::default())
    }

    #[tokio::test]
    async fn test_stale_balance_kept_on_failure() {
        let api = InMemoryWalletApi::new();
        api.set_balance(Balance::new(dec!(70000))).await;
        let mut wallet = service(&api);

        wallet.refresh_balance().await.unwrap();
        api.set_offline(true).await;

        assert!(matches!(
            wallet.refresh_balance().await,
            Err(WalletError::TransportError(_))
        ));
        assert_eq!(wallet.balance(), Some(Balance::new(dec!(70000))));
    }

    #[tokio::test]
    async fn test_pagination_stops_on_short_page() {
        let api = InMemoryWalletApi::new();
        for i in 0..45 {
            api.push_transaction(tx(i)).await;
        }
        let mut wallet = service(&api);

        assert_eq!(wallet.reload_transactions().await.unwrap().len(), 20);
        assert!(wallet.has_more_transactions());

        assert_eq!(wallet.load_more_transactions().await.unwrap(), 20);
        assert_eq!(wallet.load_more_transactions().await.unwrap(), 5);
        assert!(!wallet.has_more_transactions());

        let calls = api.calls().await;
        assert_eq!(wallet.load_more_transactions().await.unwrap(), 0);
        assert_eq!(api.calls().await, calls);
        assert_eq!(wallet.transactions().len(), 45);
        assert_eq!(wallet.transactions()[44].id, "tx-44");
    }

    #[tokio::test]
    async fn test_reload_resets_pagination() {
        let api = InMemoryWalletApi::new();
        for i in 0..25 {
            api.push_transaction(tx(i)).await;
        }
        let mut wallet = service(&api);

        wallet.reload_transactions().await.unwrap();
        wallet.load_more_transactions().await.unwrap();
        assert_eq!(wallet.transactions().len(), 25);

        wallet.reload_transactions().await.unwrap();
        assert_eq!(wallet.transactions().len(), 20);
        assert!(wallet.has_more_transactions());
    }

    #[tokio::test]
    async fn test_failed_page_keeps_history() {
        let api = InMemoryWalletApi::new();
        for i in 0..30 {
            api.push_transaction(tx(i)).await;
        }
        let mut wallet = service(&api);
        wallet.reload_transactions().await.unwrap();

        api.set_offline(true).await;
        assert!(wallet.load_more_transactions().await.is_err());
        assert_eq!(wallet.transactions().len(), 20);

        api.set_offline(false).await;
        assert_eq!(wallet.load_more_transactions().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_statistics_cached_per_period() {
        let api = InMemoryWalletApi::new();
        api.set_statistics(
            StatisticsPeriod::Week,
            Statistics {
                total_recharge: dec!(200000),
                transaction_count: 3,
                ..Statistics::default()
            },
        )
        .await;
        let mut wallet = service(&api);

        let stats = wallet.load_statistics(StatisticsPeriod::Week).await.unwrap();
        assert_eq!(stats.total_recharge, dec!(200000));
        assert_eq!(wallet.period(), StatisticsPeriod::Week);
        assert!(wallet.statistics(StatisticsPeriod::Month).is_none());
    }

    #[tokio::test]
    async fn test_failed_statistics_load_keeps_period_and_figures() {
        let api = InMemoryWalletApi::new();
        api.set_statistics(
            StatisticsPeriod::Month,
            Statistics {
                total_spent: dec!(75000),
                transaction_count: 2,
                ..Statistics::default()
            },
        )
        .await;
        let mut wallet = service(&api);
        wallet.load_statistics(StatisticsPeriod::Month).await.unwrap();

        api.set_offline(true).await;
        assert!(wallet.load_statistics(StatisticsPeriod::Year).await.is_err());

        assert_eq!(wallet.period(), StatisticsPeriod::Month);
        assert!(wallet.statistics(StatisticsPeriod::Year).is_none());
        assert_eq!(
            wallet
                .statistics(StatisticsPeriod::Month)
                .map(|s| s.total_spent),
            Some(dec!(75000))
        );
    }

    #[tokio::test]
    async fn test_invalid_recharge_never_reaches_api() {
        let api = InMemoryWalletApi::new();
        let wallet = service(&api);

        for input in ["abc", "5000", "20000000", "0", "-10000"] {
            assert!(matches!(
                wallet.start_recharge(input).await,
                Err(WalletError::ValidationError(_))
            ));
        }
        assert_eq!(api.calls().await, 0);
    }

    #[tokio::test]
    async fn test_recharge_uses_configured_redirects() {
        let api = InMemoryWalletApi::new();
        let wallet = service(&api);

        let pending = wallet.start_recharge("100.000").await.unwrap();

        assert_eq!(pending.amount.value(), 100_000);
        assert!(pending.payment_url.contains("vnp_Amount=10000000"));
        assert!(!pending.resolver.is_resolved());

        let sent = api.recharges().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].return_url, WalletConfig::default().return_url);
        assert_eq!(sent[0].cancel_url, WalletConfig::default().cancel_url);
    }

    #[tokio::test]
    async fn test_finish_payment_reloads_wallet() {
        let api = InMemoryWalletApi::new();
        let mut wallet = service(&api);
        api.set_balance(Balance::new(dec!(150000))).await;

        let outcome = PaymentOutcome::Failed {
            response_code: Some("24".to_string()),
            message: "customer cancelled the transaction".to_string(),
        };
        wallet.finish_payment(&outcome).await.unwrap();

        assert_eq!(wallet.balance(), Some(Balance::new(dec!(150000))));
        assert!(wallet.statistics(StatisticsPeriod::Month).is_some());
    }
}
