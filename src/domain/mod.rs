//! Domain types and the pure logic of quotes and payment outcomes.
//!
//! Nothing in here performs I/O; the `ports` module defines the traits the
//! application layer uses to reach the wallet API and the embedded browser.

pub mod money;
pub mod payment;
pub mod ports;
pub mod quote;
pub mod wallet;
