//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use transfer_types::{
    CreateTransferRequest, CreateWalletRequest, ErrorBody, LedgerRepository, TransferError,
    TransferId, WalletId, WalletResponse, WalletStore,
};

use crate::TransferCoordinator;

/// Application state shared across handlers.
pub struct AppState<W: WalletStore, L: LedgerRepository> {
    pub coordinator: TransferCoordinator<W, L>,
}

/// Wrapper to implement IntoResponse for TransferError (orphan rule
/// workaround).
pub struct ApiError(pub TransferError);

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TransferError::WalletNotFound(_) | TransferError::TransferNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            TransferError::InvalidAmount(_)
            | TransferError::CurrencyMismatch { .. }
            | TransferError::Validation(_)
            | TransferError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
            TransferError::InsufficientFundsOnReversal { .. }
            | TransferError::InvalidState(_) => StatusCode::CONFLICT,
            TransferError::Busy => StatusCode::TOO_MANY_REQUESTS,
            TransferError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            TransferError::Reconciliation { .. } | TransferError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let (available, requested) = match &self.0 {
            TransferError::InsufficientFunds {
                available,
                requested,
            }
            | TransferError::InsufficientFundsOnReversal {
                available,
                requested,
            } => (Some(*available), Some(*requested)),
            _ => (None, None),
        };

        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind().to_string(),
            code: status.as_u16(),
            available,
            requested,
        };

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Wallets
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip(state, req), fields(owner = %req.owner))]
pub async fn create_wallet<W: WalletStore, L: LedgerRepository>(
    State(state): State<Arc<AppState<W, L>>>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet = state.coordinator.create_wallet(req).await?;
    Ok((StatusCode::CREATED, Json(WalletResponse::from(&wallet))))
}

#[tracing::instrument(skip(state), fields(wallet_id = %id))]
pub async fn get_wallet<W: WalletStore, L: LedgerRepository>(
    State(state): State<Arc<AppState<W, L>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let wallet_id: WalletId = id
        .parse()
        .map_err(|_| TransferError::Validation("Invalid wallet ID".into()))?;

    let wallet = state.coordinator.get_wallet(wallet_id).await?;
    Ok(Json(WalletResponse::from(&wallet)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Transfers
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(
    skip(state, req),
    fields(
        key = %req.idempotency_key,
        sender = %req.sender_wallet_id,
        receiver = %req.receiver_wallet_id,
        amount = req.amount
    )
)]
pub async fn create_transfer<W: WalletStore, L: LedgerRepository>(
    State(state): State<Arc<AppState<W, L>>>,
    Json(req): Json<CreateTransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.coordinator.create_transfer(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[tracing::instrument(skip(state), fields(transfer_id = %id))]
pub async fn get_transfer<W: WalletStore, L: LedgerRepository>(
    State(state): State<Arc<AppState<W, L>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| TransferError::Validation("Invalid transfer ID".into()))?;

    let record = state.coordinator.get_transfer(transfer_id).await?;
    Ok(Json(record))
}

#[tracing::instrument(skip(state))]
pub async fn list_transfers<W: WalletStore, L: LedgerRepository>(
    State(state): State<Arc<AppState<W, L>>>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.coordinator.list_transfers().await?;
    Ok(Json(records))
}

#[tracing::instrument(skip(state), fields(transfer_id = %id))]
pub async fn cancel_transfer<W: WalletStore, L: LedgerRepository>(
    State(state): State<Arc<AppState<W, L>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let transfer_id: TransferId = id
        .parse()
        .map_err(|_| TransferError::Validation("Invalid transfer ID".into()))?;

    let record = state.coordinator.cancel_transfer(transfer_id).await?;
    Ok(Json(record))
}
