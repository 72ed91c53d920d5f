use crate::config::WalletConfig;
use crate::domain::ports::WalletApi;
use crate::domain::wallet::{
    ApiResponse, PageRequest, PaymentLink, RechargeRequest, Statistics, StatisticsPeriod,
    Transaction, WalletBalance,
};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Wallet API client speaking JSON over HTTP.
///
/// Every endpoint returns the `{success, data, message}` envelope; non-2xx
/// statuses and `success: false` both surface as `WalletError::TransportError`.
#[derive(Clone)]
pub struct HttpWalletApi {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HttpWalletApi {
    pub fn new(base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let base = base.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base,
            token,
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        Self::new(config.api_base.clone(), config.api_token.clone())
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let res = self.authorized(request).send().await?;
        decode(res).await
    }
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();

    if !status.is_success() {
        // Error bodies usually still carry the envelope's message.
        let message = res
            .json::<ApiResponse<serde_json::Value>>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());
        return Err(WalletError::TransportError(format!(
            "wallet API returned {}: {message}",
            status.as_u16()
        )));
    }

    let body: ApiResponse<T> = res.json().await?;
    body.into_data()
}

#[async_trait]
impl WalletApi for HttpWalletApi {
    #[tracing::instrument(skip(self))]
    async fn balance(&self) -> Result<WalletBalance> {
        self.send(self.client.get(self.endpoint("wallet/balance")))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn transactions(&self, page: PageRequest) -> Result<Vec<Transaction>> {
        self.send(
            self.client
                .get(self.endpoint("wallet/transactions"))
                .query(&[("page", page.page), ("limit", page.limit)]),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn statistics(&self, period: StatisticsPeriod) -> Result<Statistics> {
        self.send(
            self.client
                .get(self.endpoint("wallet/statistics"))
                .query(&[("period", period.as_str())]),
        )
        .await
    }

    #[tracing::instrument(skip(self), fields(amount = request.amount.value()))]
    async fn recharge(&self, request: RechargeRequest) -> Result<PaymentLink> {
        self.send(
            self.client
                .post(self.endpoint("wallet/recharge"))
                .json(&request),
        )
        .await
    }
}
