//! Application layer orchestrating the wallet screens and payment sessions.
//!
//! `WalletService` caches what the wallet screen shows and starts recharges;
//! `PaymentSession` forwards embedded-browser notifications into a
//! `PaymentOutcomeResolver` until the attempt settles.

pub mod payment;
pub mod wallet;
