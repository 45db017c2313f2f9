//! # Receipt Repository
//!
//! Database operations for immutable checkout artifacts.
//!
//! ## One Receipt Per Session
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Closing the Double-Checkout Race                             │
//! │                                                                         │
//! │  Two concurrent checkouts for session s1:                              │
//! │                                                                         │
//! │  1. Both call exists_for_session_tx(s1) inside their own              │
//! │     transaction → both may see false                                   │
//! │                                                                         │
//! │  2. Both attempt INSERT INTO receipts (session_id = s1)                │
//! │                                                                         │
//! │  3. The partial unique index on receipts(session_id) lets exactly      │
//! │     one commit; the loser's transaction rolls back with a              │
//! │     UniqueViolation, which the engine reports as DuplicateCheckout.    │
//! │                                                                         │
//! │  The in-transaction existence check gives the common case a clean      │
//! │  error before any stock is touched; the index is the authority.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use arcadia_core::types::Receipt;

use crate::error::DbResult;
use crate::rows::{ReceiptItemRow, ReceiptRow};

const RECEIPT_COLUMNS: &str =
    "id, session_id, gaming_mode, duration_minutes, rate_1v1_cents, rate_2v2_cents, \
     rate_used_cents, calculated_cost_cents, charged_cost_cents, subtotal_cents, \
     tax_cents, total_cents, payment_method, created_at";

const RECEIPT_ITEM_COLUMNS: &str =
    "id, receipt_id, product_id, name_snapshot, quantity, unit_price_cents, line_total_cents";

/// Repository for receipt database operations.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    /// Creates a new ReceiptRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReceiptRepository { pool }
    }

    /// Gets a receipt with its item lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Receipt>> {
        let row: Option<ReceiptRow> = sqlx::query_as(&format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<ReceiptItemRow> = sqlx::query_as(&format!(
            "SELECT {RECEIPT_ITEM_COLUMNS} FROM receipt_items WHERE receipt_id = ?1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_domain(items).map(Some)
    }

    /// Checks whether a receipt already settles the given session.
    pub async fn exists_for_session(&self, session_id: &str) -> DbResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    // =========================================================================
    // Transactional operations (used by the checkout engine)
    // =========================================================================

    /// Existence check inside the checkout transaction.
    pub async fn exists_for_session_tx(
        conn: &mut SqliteConnection,
        session_id: &str,
    ) -> DbResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE session_id = ?1")
                .bind(session_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(count > 0)
    }

    /// Inserts a receipt and all of its item lines.
    ///
    /// Runs on the checkout transaction's connection so the receipt, its
    /// lines, and every stock decrement commit together or not at all.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if a receipt for the same session was
    /// committed concurrently (partial unique index).
    pub async fn insert_tx(conn: &mut SqliteConnection, receipt: &Receipt) -> DbResult<()> {
        debug!(
            id = %receipt.id,
            session_id = ?receipt.session_id,
            total_cents = receipt.total_cents,
            "Inserting receipt"
        );

        let usage = receipt.console_usage.as_ref();

        sqlx::query(
            "INSERT INTO receipts (id, session_id, gaming_mode, duration_minutes, rate_1v1_cents,
                                   rate_2v2_cents, rate_used_cents, calculated_cost_cents,
                                   charged_cost_cents, subtotal_cents, tax_cents, total_cents,
                                   payment_method, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&receipt.id)
        .bind(&receipt.session_id)
        .bind(usage.map(|u| u.gaming_mode.as_str()))
        .bind(usage.map(|u| u.duration_minutes))
        .bind(usage.map(|u| u.rate_1v1_cents))
        .bind(usage.map(|u| u.rate_2v2_cents))
        .bind(usage.map(|u| u.rate_used_cents))
        .bind(usage.map(|u| u.calculated_cost_cents))
        .bind(usage.map(|u| u.charged_cost_cents))
        .bind(receipt.subtotal_cents)
        .bind(receipt.tax_cents)
        .bind(receipt.total_cents)
        .bind(receipt.payment_method.as_str())
        .bind(receipt.created_at)
        .execute(&mut *conn)
        .await?;

        for item in &receipt.items {
            sqlx::query(
                "INSERT INTO receipt_items (id, receipt_id, product_id, name_snapshot, quantity,
                                            unit_price_cents, line_total_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&item.id)
            .bind(&item.receipt_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.line_total_cents)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
