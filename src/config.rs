//! Static limits and runtime configuration.
//!
//! Constants describe the wallet and gateway contract; `WalletConfig` carries the
//! per-deployment values (API base URL, token, redirect URLs) read from the
//! environment.

use crate::error::{Result, WalletError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;

/// Rate used when a quote or vehicle type carries no base rate.
pub const DEFAULT_BASE_RATE: Decimal = dec!(10000);

/// Smallest recharge accepted, in whole currency units.
pub const MIN_RECHARGE_AMOUNT: u64 = 10_000;
/// Largest recharge accepted, in whole currency units.
pub const MAX_RECHARGE_AMOUNT: u64 = 10_000_000;

/// Transactions requested per page.
pub const TRANSACTION_PAGE_SIZE: u32 = 20;

/// Path fragment of the gateway's cancel redirect.
pub const GATEWAY_CANCEL_MARKER: &str = "vnpay/cancel";
/// Path fragment of the gateway's return redirect.
pub const GATEWAY_RETURN_MARKER: &str = "vnpay/return";

pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api";
pub const DEFAULT_RETURN_URL: &str = "http://localhost:3000/api/vnpay/return";
pub const DEFAULT_CANCEL_URL: &str = "http://localhost:3000/api/vnpay/cancel";

pub const ENV_API_BASE: &str = "FAREPAY_API_BASE";
pub const ENV_API_TOKEN: &str = "FAREPAY_API_TOKEN";
pub const ENV_RETURN_URL: &str = "FAREPAY_RETURN_URL";
pub const ENV_CANCEL_URL: &str = "FAREPAY_CANCEL_URL";

/// Markers used to recognise terminal gateway redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub cancel_marker: String,
    pub return_marker: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cancel_marker: GATEWAY_CANCEL_MARKER.to_string(),
            return_marker: GATEWAY_RETURN_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConfig {
    pub api_base: String,
    pub api_token: Option<String>,
    pub return_url: String,
    pub cancel_url: String,
    pub gateway: GatewayConfig,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            return_url: DEFAULT_RETURN_URL.to_string(),
            cancel_url: DEFAULT_CANCEL_URL.to_string(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl WalletConfig {
    /// Builds a configuration from `FAREPAY_*` environment variables, falling
    /// back to the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(api_base) = read_var(ENV_API_BASE)? {
            config.api_base = api_base;
        }
        config.api_token = read_var(ENV_API_TOKEN)?;
        if let Some(return_url) = read_var(ENV_RETURN_URL)? {
            config.return_url = return_url;
        }
        if let Some(cancel_url) = read_var(ENV_CANCEL_URL)? {
            config.cancel_url = cancel_url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that every URL parses and that the redirect URLs carry the
    /// gateway markers the resolver looks for.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("api base", &self.api_base),
            ("return url", &self.return_url),
            ("cancel url", &self.cancel_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| WalletError::ConfigError(format!("invalid {name} '{value}': {e}")))?;
        }

        if !self.return_url.contains(&self.gateway.return_marker) {
            return Err(WalletError::ConfigError(format!(
                "return url must contain '{}'",
                self.gateway.return_marker
            )));
        }
        if !self.cancel_url.contains(&self.gateway.cancel_marker) {
            return Err(WalletError::ConfigError(format!(
                "cancel url must contain '{}'",
                self.gateway.cancel_marker
            )));
        }

        Ok(())
    }
}

fn read_var(name: &str) -> Result<Option<String>> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(WalletError::ConfigError(format!(
            "{name} is not valid unicode"
        ))),
    }
}
