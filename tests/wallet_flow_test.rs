mod common;

use async_trait::async_trait;
use common::{CANCEL_URL, CHECKOUT_PAGE, return_url, success_url};
use farepay::application::payment::{PaymentSession, SessionInput};
use farepay::application::wallet::WalletService;
use farepay::config::WalletConfig;
use farepay::domain::money::Balance;
use farepay::domain::payment::{CancelReason, NavigationEvent, PaymentOutcome, PaymentReceipt};
use farepay::domain::ports::PaymentObserver;
use farepay::infrastructure::in_memory::{InMemoryBrowser, InMemoryWalletApi};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

#[derive(Default, Clone)]
struct Screen {
    shown: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PaymentObserver for Screen {
    async fn on_success(&self, receipt: &PaymentReceipt) {
        self.shown
            .lock()
            .await
            .push(format!("paid {}", receipt.amount().normalize()));
    }

    async fn on_failure(&self, outcome: &PaymentOutcome) {
        self.shown.lock().await.push(outcome.to_string());
    }
}

async fn run_recharge(
    api: &InMemoryWalletApi,
    amount: &str,
    redirects: Vec<SessionInput>,
) -> (PaymentOutcome, WalletService, InMemoryBrowser, Screen) {
    let mut wallet = WalletService::new(Box::new(api.clone()), WalletConfig::default());
    let pending = wallet.start_recharge(amount).await.unwrap();
    let payment_url = pending.payment_url;

    let browser = InMemoryBrowser::new();
    let screen = Screen::default();
    let session = PaymentSession::new(
        pending.resolver,
        Box::new(browser.clone()),
        Box::new(screen.clone()),
    );

    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(async move { session.run(&payment_url, rx).await });
    for input in redirects {
        // The session may already have stopped listening after a terminal event.
        let _ = tx.send(input).await;
    }
    drop(tx);

    let outcome = handle.await.unwrap();
    wallet.finish_payment(&outcome).await.unwrap();
    (outcome, wallet, browser, screen)
}

fn nav(url: &str) -> SessionInput {
    SessionInput::Navigation(NavigationEvent::new(url))
}

#[tokio::test]
async fn test_successful_recharge_refreshes_wallet() {
    let api = InMemoryWalletApi::new();
    api.set_balance(Balance::new(dec!(20000))).await;

    let api_for_gateway = api.clone();
    let (outcome, wallet, browser, screen) = run_recharge(
        &api,
        "50.000",
        vec![
            nav(CHECKOUT_PAGE),
            nav(&success_url("MEM1", 5_000_000)),
            nav(CANCEL_URL),
        ],
    )
    .await;

    assert!(outcome.is_success());
    assert!(browser.is_closed().await);
    assert_eq!(browser.loaded().await.len(), 1);
    assert!(browser.loaded().await[0].contains("vnp_Amount=5000000"));
    assert_eq!(*screen.shown.lock().await, vec!["paid 50000".to_string()]);

    let recharges = api_for_gateway.recharges().await;
    assert_eq!(recharges.len(), 1);
    assert_eq!(recharges[0].amount.value(), 50_000);
    assert_eq!(wallet.balance(), Some(Balance::new(dec!(20000))));
}

#[tokio::test]
async fn test_failed_recharge_reports_gateway_reason() {
    let api = InMemoryWalletApi::new();
    let (outcome, _, browser, screen) = run_recharge(
        &api,
        "100000",
        vec![nav(&return_url(&[
            ("vnp_ResponseCode", "11"),
            ("vnp_TransactionStatus", "02"),
            ("vnp_TxnRef", "MEM1"),
        ]))],
    )
    .await;

    assert_eq!(
        outcome,
        PaymentOutcome::Failed {
            response_code: Some("11".to_string()),
            message: "payment session expired, please try again".to_string(),
        }
    );
    assert!(browser.is_closed().await);
    assert_eq!(
        *screen.shown.lock().await,
        vec!["payment failed (11): payment session expired, please try again".to_string()]
    );
}

#[tokio::test]
async fn test_user_abort_after_confirmation() {
    let api = InMemoryWalletApi::new();
    let (outcome, _, _, screen) = run_recharge(
        &api,
        "100000",
        vec![
            nav(CHECKOUT_PAGE),
            SessionInput::AbortRequested,
            SessionInput::AbortDismissed,
            nav(CHECKOUT_PAGE),
            SessionInput::AbortRequested,
            SessionInput::AbortConfirmed,
        ],
    )
    .await;

    assert_eq!(
        outcome,
        PaymentOutcome::Cancelled {
            reason: CancelReason::UserAbort
        }
    );
    assert_eq!(screen.shown.lock().await.len(), 1);
}

#[tokio::test]
async fn test_wallet_reload_survives_outage_after_payment() {
    let api = InMemoryWalletApi::new();
    api.set_balance(Balance::new(dec!(30000))).await;

    let mut wallet = WalletService::new(Box::new(api.clone()), WalletConfig::default());
    wallet.reload().await.unwrap();

    api.set_offline(true).await;
    let outcome = PaymentOutcome::Cancelled {
        reason: CancelReason::GatewayCancel,
    };
    assert!(wallet.finish_payment(&outcome).await.is_err());
    assert_eq!(wallet.balance(), Some(Balance::new(dec!(30000))));
}
