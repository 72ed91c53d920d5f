use crate::domain::payment::{NavigationEvent, PaymentOutcome, PaymentOutcomeResolver};
use crate::domain::ports::{EmbeddedBrowserBox, PaymentObserverBox};
use tokio::sync::mpsc;

/// Everything that can happen to an open checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    Navigation(NavigationEvent),
    /// The rider tapped close; a confirmation prompt is showing.
    AbortRequested,
    AbortConfirmed,
    AbortDismissed,
}

/// Drives one payment attempt from browser notifications to a terminal outcome.
///
/// Inputs are handled strictly in arrival order. The session owns its resolver,
/// so nothing is shared between attempts.
pub struct PaymentSession {
    resolver: PaymentOutcomeResolver,
    browser: EmbeddedBrowserBox,
    observer: PaymentObserverBox,
}

impl PaymentSession {
    pub fn new(
        resolver: PaymentOutcomeResolver,
        browser: EmbeddedBrowserBox,
        observer: PaymentObserverBox,
    ) -> Self {
        Self {
            resolver,
            browser,
            observer,
        }
    }

    /// Loads `payment_url` and runs until the attempt resolves.
    ///
    /// A closed input channel before resolution counts as a user abort. A
    /// browser that fails to load the checkout page ends the attempt as failed.
    /// A resolver that is already resolved returns its stored outcome without
    /// opening the page or notifying the observer again.
    #[tracing::instrument(skip(self, inputs))]
    pub async fn run(
        mut self,
        payment_url: &str,
        mut inputs: mpsc::Receiver<SessionInput>,
    ) -> PaymentOutcome {
        if let Some(outcome) = self.resolver.outcome() {
            tracing::debug!(%outcome, "attempt already resolved, checkout page not opened");
            return outcome.clone();
        }

        if let Err(e) = self.browser.load(payment_url).await {
            tracing::warn!(error = %e, "checkout page failed to load");
            let outcome = PaymentOutcome::Failed {
                response_code: None,
                message: format!("unable to open payment page: {e}"),
            };
            self.observer.on_failure(&outcome).await;
            return outcome;
        }

        let outcome = loop {
            let Some(input) = inputs.recv().await else {
                tracing::debug!("session inputs closed before a terminal redirect");
                break self.resolver.settle();
            };

            if let Some(outcome) = self.apply(input) {
                break outcome;
            }
        };

        self.finish(&outcome).await;
        outcome
    }

    fn apply(&mut self, input: SessionInput) -> Option<PaymentOutcome> {
        match input {
            SessionInput::Navigation(event) => {
                tracing::trace!(url = %event.url, "navigation");
                self.resolver.observe(&event)
            }
            SessionInput::AbortRequested => {
                self.resolver.request_abort();
                None
            }
            SessionInput::AbortConfirmed => self.resolver.confirm_abort(),
            SessionInput::AbortDismissed => {
                self.resolver.dismiss_abort();
                None
            }
        }
    }

    async fn finish(&self, outcome: &PaymentOutcome) {
        tracing::info!(%outcome, "payment resolved");

        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "failed to close checkout page");
        }

        match outcome {
            PaymentOutcome::Success(receipt) => self.observer.on_success(receipt).await,
            _ => self.observer.on_failure(outcome).await,
        }
    }
}
