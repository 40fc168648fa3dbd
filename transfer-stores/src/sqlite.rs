//! SQLite ledger adapter.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use transfer_types::{
    LedgerError, LedgerRepository, TransferId, TransferRecord, TransferStatus,
};

use crate::types::{DbTransferRecord, DbTransferStatus};

const SELECT_COLUMNS: &str = "id, idempotency_key, sender_wallet_id, receiver_wallet_id, \
     amount, currency, status, sender_balance_before, receiver_balance_before, \
     sender_balance_after, receiver_balance_after, description, created_at";

/// Durable transfer ledger on SQLite.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Opens (creating if missing) the ledger database and runs migrations.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let ddl = include_str!("../migrations/0001_create_transfers.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

#[async_trait]
impl LedgerRepository for SqliteLedger {
    async fn create(&self, record: TransferRecord) -> Result<TransferRecord, LedgerError> {
        let result = sqlx::query(
            r#"INSERT INTO transfers
               (id, idempotency_key, sender_wallet_id, receiver_wallet_id, amount, currency,
                status, sender_balance_before, receiver_balance_before, sender_balance_after,
                receiver_balance_after, description, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.idempotency_key)
        .bind(record.sender_wallet_id.to_string())
        .bind(record.receiver_wallet_id.to_string())
        .bind(record.amount.amount())
        .bind(record.amount.currency().to_string())
        .bind(record.status.to_string())
        .bind(record.sender_balance_before)
        .bind(record.receiver_balance_before)
        .bind(record.sender_balance_after)
        .bind(record.receiver_balance_after)
        .bind(&record.description)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(e) => {
                let unique_violation = e
                    .as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false);
                if unique_violation {
                    Err(LedgerError::DuplicateKey(record.idempotency_key))
                } else {
                    Err(db_err(e))
                }
            }
        }
    }

    async fn get_by_id(&self, id: TransferId) -> Result<Option<TransferRecord>, LedgerError> {
        let row: Option<DbTransferRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM transfers WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransferRecord::into_domain).transpose()
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TransferRecord>, LedgerError> {
        let row: Option<DbTransferRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM transfers WHERE idempotency_key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransferRecord::into_domain).transpose()
    }

    async fn list_all(&self) -> Result<Vec<TransferRecord>, LedgerError> {
        let rows: Vec<DbTransferRecord> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM transfers ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransferRecord::into_domain).collect()
    }

    async fn update_status(
        &self,
        id: TransferId,
        status: TransferStatus,
    ) -> Result<TransferRecord, LedgerError> {
        let id_str = id.to_string();

        // Read-check-write under one transaction so a racing update cannot
        // slip an illegal transition through.
        let mut db_tx = self.pool.begin().await.map_err(db_err)?;

        let row: Option<DbTransferStatus> =
            sqlx::query_as("SELECT status FROM transfers WHERE id = ?")
                .bind(&id_str)
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(db_err)?;

        let current = row.ok_or(LedgerError::NotFound)?;
        let from = TransferStatus::from_str(&current.status)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        if !from.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition { from, to: status });
        }

        sqlx::query("UPDATE transfers SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(&id_str)
            .execute(&mut *db_tx)
            .await
            .map_err(db_err)?;

        db_tx.commit().await.map_err(db_err)?;

        self.get_by_id(id)
            .await?
            .ok_or(LedgerError::NotFound)
    }
}
