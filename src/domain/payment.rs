//! Interpretation of payment gateway redirects.
//!
//! The embedded checkout page reports every navigation as a [`NavigationEvent`].
//! [`PaymentOutcomeResolver`] classifies those URLs and settles on exactly one
//! [`PaymentOutcome`] per payment attempt; everything after that is ignored.

use crate::config::GatewayConfig;
use crate::domain::money::MinorUnits;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const PARAM_RESPONSE_CODE: &str = "vnp_ResponseCode";
pub const PARAM_TRANSACTION_STATUS: &str = "vnp_TransactionStatus";
pub const PARAM_TXN_REF: &str = "vnp_TxnRef";
pub const PARAM_AMOUNT: &str = "vnp_Amount";
pub const PARAM_BANK_CODE: &str = "vnp_BankCode";
pub const PARAM_PAY_DATE: &str = "vnp_PayDate";

/// Value of both the response code and the transaction status on success.
pub const SUCCESS_CODE: &str = "00";

pub const PAY_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

pub const UNDETERMINED_RESULT_MESSAGE: &str = "unable to determine transaction result";
pub const GENERIC_FAILURE_MESSAGE: &str = "transaction not successful";

/// One redirect reported by the embedded browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub url: String,
}

impl NavigationEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Gateway fields of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub txn_ref: String,
    pub amount_minor_units: MinorUnits,
    pub bank_code: Option<String>,
    pub pay_date_raw: Option<String>,
}

impl PaymentReceipt {
    /// Paid amount in whole currency units.
    pub fn amount(&self) -> Decimal {
        self.amount_minor_units.to_units()
    }

    /// Payment time as reported by the gateway (`yyyyMMddHHmmss`, gateway local time).
    pub fn paid_at(&self) -> Option<NaiveDateTime> {
        self.pay_date_raw
            .as_deref()
            .and_then(|raw| NaiveDateTime::parse_from_str(raw, PAY_DATE_FORMAT).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The gateway redirected to the cancel endpoint.
    GatewayCancel,
    /// The rider closed the checkout page and confirmed.
    UserAbort,
}

impl CancelReason {
    pub fn message(&self) -> &'static str {
        match self {
            CancelReason::GatewayCancel => "user cancelled",
            CancelReason::UserAbort => "user closed the payment page",
        }
    }
}

/// Terminal result of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PaymentOutcome {
    Success(PaymentReceipt),
    Cancelled {
        reason: CancelReason,
    },
    Failed {
        #[serde(rename = "responseCode")]
        response_code: Option<String>,
        message: String,
    },
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PaymentOutcome::Success(_))
    }

    fn undetermined() -> Self {
        PaymentOutcome::Failed {
            response_code: None,
            message: UNDETERMINED_RESULT_MESSAGE.to_string(),
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentOutcome::Success(receipt) => write!(
                f,
                "payment {} succeeded: {}",
                receipt.txn_ref,
                receipt.amount().normalize()
            ),
            PaymentOutcome::Cancelled { reason } => {
                write!(f, "payment cancelled: {}", reason.message())
            }
            PaymentOutcome::Failed {
                response_code: Some(code),
                message,
            } => write!(f, "payment failed ({code}): {message}"),
            PaymentOutcome::Failed {
                response_code: None,
                message,
            } => write!(f, "payment failed: {message}"),
        }
    }
}

/// Maps gateway response codes to readable failure reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCodeTable {
    messages: HashMap<String, String>,
    fallback: String,
}

const VNPAY_MESSAGES: &[(&str, &str)] = &[
    (
        "07",
        "money was deducted but the transaction is suspected of fraud",
    ),
    (
        "09",
        "card or account is not registered for internet banking",
    ),
    (
        "10",
        "card or account verification failed more than 3 times",
    ),
    ("11", "payment session expired, please try again"),
    ("12", "card or account is locked"),
    ("13", "wrong one-time password (OTP)"),
    ("24", "customer cancelled the transaction"),
    ("51", "insufficient account balance"),
    ("65", "account exceeded its daily transaction limit"),
    ("75", "the bank is under maintenance"),
    ("79", "wrong payment password entered too many times"),
    ("97", "invalid signature"),
    ("99", "unknown error"),
];

impl ResponseCodeTable {
    pub fn new<I, K, V>(entries: I, fallback: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            messages: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            fallback: fallback.into(),
        }
    }

    /// The standard VNPay response code table.
    pub fn vnpay() -> Self {
        Self::new(VNPAY_MESSAGES.iter().copied(), GENERIC_FAILURE_MESSAGE)
    }

    pub fn message(&self, code: &str) -> &str {
        self.messages
            .get(code)
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ResponseCodeTable {
    fn default() -> Self {
        Self::vnpay()
    }
}

/// Gateway parameters extracted from a return redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayResponse {
    pub response_code: Option<String>,
    pub transaction_status: Option<String>,
    pub txn_ref: Option<String>,
    pub amount: Option<String>,
    pub bank_code: Option<String>,
    pub pay_date: Option<String>,
}

impl GatewayResponse {
    /// Decodes the query string of `url`. Repeated keys keep their last value.
    ///
    /// Relative URLs (`/vnpay/return?...`) are accepted; anything after `#` is
    /// ignored.
    pub fn from_url(url: &str) -> Self {
        let params = query_params(url);
        let take = |key: &str| params.get(key).filter(|v| !v.is_empty()).cloned();

        Self {
            response_code: take(PARAM_RESPONSE_CODE),
            transaction_status: take(PARAM_TRANSACTION_STATUS),
            txn_ref: take(PARAM_TXN_REF),
            amount: take(PARAM_AMOUNT),
            bank_code: take(PARAM_BANK_CODE),
            pay_date: take(PARAM_PAY_DATE),
        }
    }

    pub fn is_success(&self) -> bool {
        self.response_code.as_deref() == Some(SUCCESS_CODE)
            && self.transaction_status.as_deref() == Some(SUCCESS_CODE)
    }

    fn into_outcome(self, table: &ResponseCodeTable) -> PaymentOutcome {
        let Some(code) = self.response_code.clone() else {
            return PaymentOutcome::undetermined();
        };

        if !self.is_success() {
            let message = table.message(&code).to_string();
            return PaymentOutcome::Failed {
                response_code: Some(code),
                message,
            };
        }

        let amount = self.amount.as_deref().and_then(|raw| raw.parse::<u64>().ok());
        match (self.txn_ref, amount) {
            (Some(txn_ref), Some(amount)) => PaymentOutcome::Success(PaymentReceipt {
                txn_ref,
                amount_minor_units: MinorUnits(amount),
                bank_code: self.bank_code,
                pay_date_raw: self.pay_date,
            }),
            _ => PaymentOutcome::undetermined(),
        }
    }
}

fn query_params(url: &str) -> HashMap<String, String> {
    let query = match url::Url::parse(url) {
        Ok(parsed) => parsed.query().map(str::to_string),
        Err(_) => url
            .split_once('?')
            .map(|(_, rest)| rest.split('#').next().unwrap_or_default().to_string()),
    };

    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Classifies one redirect URL, or returns `None` for intermediate pages.
pub fn classify(
    url: &str,
    config: &GatewayConfig,
    table: &ResponseCodeTable,
) -> Option<PaymentOutcome> {
    if url.contains(&config.cancel_marker) {
        return Some(PaymentOutcome::Cancelled {
            reason: CancelReason::GatewayCancel,
        });
    }

    let response = GatewayResponse::from_url(url);
    if url.contains(&config.return_marker) || response.response_code.is_some() {
        return Some(response.into_outcome(table));
    }

    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Awaiting { abort_pending: bool },
    Resolved(PaymentOutcome),
}

/// State machine for a single payment attempt.
///
/// Starts in `Awaiting`; the first navigation event (or confirmed abort) that
/// yields an outcome moves it to `Resolved`, after which it is inert.
#[derive(Debug, Clone)]
pub struct PaymentOutcomeResolver {
    config: GatewayConfig,
    table: Arc<ResponseCodeTable>,
    state: ResolverState,
}

impl PaymentOutcomeResolver {
    pub fn new(config: GatewayConfig, table: Arc<ResponseCodeTable>) -> Self {
        Self {
            config,
            table,
            state: ResolverState::Awaiting {
                abort_pending: false,
            },
        }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    pub fn outcome(&self) -> Option<&PaymentOutcome> {
        match &self.state {
            ResolverState::Resolved(outcome) => Some(outcome),
            ResolverState::Awaiting { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, ResolverState::Resolved(_))
    }

    pub fn abort_pending(&self) -> bool {
        matches!(
            self.state,
            ResolverState::Awaiting {
                abort_pending: true
            }
        )
    }

    /// Feeds one navigation event. Returns the outcome only on the transition
    /// into `Resolved`.
    pub fn observe(&mut self, event: &NavigationEvent) -> Option<PaymentOutcome> {
        if self.is_resolved() {
            return None;
        }

        let outcome = classify(&event.url, &self.config, &self.table)?;
        self.state = ResolverState::Resolved(outcome.clone());
        Some(outcome)
    }

    /// Records the rider's intent to close the checkout page. Returns whether
    /// the intent is now pending (false once resolved).
    pub fn request_abort(&mut self) -> bool {
        match &mut self.state {
            ResolverState::Awaiting { abort_pending } => {
                *abort_pending = true;
                true
            }
            ResolverState::Resolved(_) => false,
        }
    }

    pub fn dismiss_abort(&mut self) {
        if let ResolverState::Awaiting { abort_pending } = &mut self.state {
            *abort_pending = false;
        }
    }

    /// Confirms a pending abort, resolving the attempt as cancelled.
    ///
    /// Without a prior [`request_abort`](Self::request_abort) this does nothing.
    pub fn confirm_abort(&mut self) -> Option<PaymentOutcome> {
        if !self.abort_pending() {
            return None;
        }

        let outcome = PaymentOutcome::Cancelled {
            reason: CancelReason::UserAbort,
        };
        self.state = ResolverState::Resolved(outcome.clone());
        Some(outcome)
    }

    /// Resolves as cancelled unless already resolved; used when the browser
    /// goes away without reporting a terminal redirect.
    pub fn force_cancel(&mut self) -> Option<PaymentOutcome> {
        if self.is_resolved() {
            return None;
        }
        Some(self.settle())
    }

    /// Ends the attempt and returns its one outcome. An attempt still awaiting
    /// is cancelled as a user abort; a resolved one keeps its stored outcome.
    pub fn settle(&mut self) -> PaymentOutcome {
        match &self.state {
            ResolverState::Resolved(outcome) => outcome.clone(),
            ResolverState::Awaiting { .. } => {
                let outcome = PaymentOutcome::Cancelled {
                    reason: CancelReason::UserAbort,
                };
                self.state = ResolverState::Resolved(outcome.clone());
                outcome
            }
        }
    }
}

impl Default for PaymentOutcomeResolver {
    fn default() -> Self {
        Self::new(GatewayConfig::default(), Arc::new(ResponseCodeTable::vnpay()))
    }
}
