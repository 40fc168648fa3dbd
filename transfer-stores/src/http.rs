//! HTTP wallet store adapter.
//!
//! Client for a remote wallet/account service that owns the balances. Per
//! the coordinator's contract, transport failures (timeout, 5xx, connection
//! refused) surface as `StoreError::Unavailable` - retryable - while a
//! functional insufficient-funds rejection stays a distinct, terminal error.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use transfer_types::{
    BalanceAdjustment, BalanceResponse, CreateWalletRequest, Currency, ErrorBody, Money,
    StoreError, Wallet, WalletId, WalletResponse, WalletStore,
};

/// Wallet store backed by a remote HTTP service.
pub struct HttpWalletStore {
    base_url: String,
    http: Client,
}

impl HttpWalletStore {
    /// Creates a new client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_error(resp: reqwest::Response) -> (StatusCode, ErrorBody) {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&body).unwrap_or(ErrorBody {
            error: body,
            kind: "unknown".into(),
            code: status.as_u16(),
            available: None,
            requested: None,
        });
        (status, parsed)
    }

    /// Maps a non-success adjustment response onto the store taxonomy.
    async fn adjustment_error(
        id: WalletId,
        amount: Money,
        resp: reqwest::Response,
    ) -> StoreError {
        let (status, body) = Self::read_error(resp).await;
        match status {
            StatusCode::NOT_FOUND => StoreError::WalletNotFound(id),
            _ if body.kind == "insufficient_funds" => StoreError::InsufficientFunds {
                available: body.available.unwrap_or(0),
                requested: body.requested.unwrap_or(amount.amount()),
            },
            _ if status.is_client_error() => StoreError::Rejected(body.error),
            _ => StoreError::Unavailable(format!("HTTP {}: {}", status, body.error)),
        }
    }

    async fn adjust(
        &self,
        id: WalletId,
        amount: Money,
        direction: &str,
    ) -> Result<Money, StoreError> {
        let body = BalanceAdjustment {
            amount: amount.amount(),
            currency: amount.currency(),
        };
        let resp = self
            .http
            .post(self.url(&format!("/wallets/{id}/{direction}")))
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::adjustment_error(id, amount, resp).await);
        }

        let balance: BalanceResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Money::new(balance.balance, balance.currency).map_err(Into::into)
    }
}

fn into_wallet(dto: WalletResponse) -> Result<Wallet, StoreError> {
    let balance = Money::new(dto.balance, dto.currency)?;
    Ok(Wallet::from_parts(dto.id, dto.owner, balance, dto.created_at))
}

#[async_trait]
impl WalletStore for HttpWalletStore {
    async fn create_wallet(
        &self,
        owner: &str,
        currency: Currency,
        opening_balance: i64,
    ) -> Result<Wallet, StoreError> {
        let req = CreateWalletRequest {
            owner: owner.to_string(),
            currency,
            opening_balance,
        };
        let resp = self
            .http
            .post(self.url("/wallets"))
            .json(&req)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let (status, body) = Self::read_error(resp).await;
            return Err(if status.is_client_error() {
                StoreError::Rejected(body.error)
            } else {
                StoreError::Unavailable(format!("HTTP {}: {}", status, body.error))
            });
        }

        let dto: WalletResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        into_wallet(dto)
    }

    async fn get_wallet(&self, id: WalletId) -> Result<Option<Wallet>, StoreError> {
        let resp = self
            .http
            .get(self.url(&format!("/wallets/{id}")))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let dto: WalletResponse = resp
                    .json()
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                into_wallet(dto).map(Some)
            }
            status => {
                let (_, body) = Self::read_error(resp).await;
                Err(StoreError::Unavailable(format!(
                    "HTTP {}: {}",
                    status, body.error
                )))
            }
        }
    }

    async fn debit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        self.adjust(id, amount, "debit").await
    }

    async fn credit(&self, id: WalletId, amount: Money) -> Result<Money, StoreError> {
        self.adjust(id, amount, "credit").await
    }
}
