//! # Session Repository
//!
//! Database operations for rental sessions and their running tabs.
//!
//! ## Lifecycle Writes
//! All lifecycle mutations go through [`update_lifecycle_tx`], guarded on
//! the status the caller read at the start of its transaction:
//!
//! ```text
//! UPDATE sessions SET ... WHERE id = ? AND status = ?expected
//! ```
//!
//! rows_affected = 0 means another call transitioned the row first; the
//! engine re-reads and reports the precise domain error instead of
//! double-applying a transition. This is the same check-and-write-as-one-
//! statement idiom the console claim uses.
//!
//! [`update_lifecycle_tx`]: SessionRepository::update_lifecycle_tx

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use arcadia_core::types::{SessionItem, SessionStatus};
use arcadia_core::Session;

use crate::error::DbResult;
use crate::rows::{SessionItemRow, SessionRow};

const SESSION_COLUMNS: &str = "id, console_id, status, gaming_mode, start_time, paused_at, \
     total_paused_ms, end_time, final_cost_cents, created_at, updated_at";

const SESSION_ITEM_COLUMNS: &str =
    "id, session_id, product_id, name_snapshot, quantity, unit_price_cents, \
     line_total_cents, created_at";

/// Repository for session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Gets a session by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Session::try_from).transpose()
    }

    /// Lists sessions that have not ended, oldest first.
    pub async fn list_open(&self) -> DbResult<Vec<Session>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE status != 'ended' ORDER BY start_time"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Session::try_from).collect()
    }

    /// Gets the running tab for a session, oldest line first.
    pub async fn items(&self, session_id: &str) -> DbResult<Vec<SessionItem>> {
        let rows: Vec<SessionItemRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_ITEM_COLUMNS} FROM session_items WHERE session_id = ?1 ORDER BY created_at"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SessionItem::from).collect())
    }

    // =========================================================================
    // Transactional operations (used by the engines)
    // =========================================================================

    /// Gets a session by ID using an open transaction's connection.
    pub async fn get_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(Session::try_from).transpose()
    }

    /// Inserts a freshly started session.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the console already backs an open
    /// session (partial unique index).
    pub async fn insert_tx(conn: &mut SqliteConnection, session: &Session) -> DbResult<()> {
        debug!(id = %session.id, console_id = %session.console_id, "Inserting session");

        sqlx::query(
            "INSERT INTO sessions (id, console_id, status, gaming_mode, start_time, paused_at,
                                   total_paused_ms, end_time, final_cost_cents, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&session.id)
        .bind(&session.console_id)
        .bind(session.status.as_str())
        .bind(session.gaming_mode.as_str())
        .bind(session.start_time)
        .bind(session.paused_at)
        .bind(session.total_paused_ms)
        .bind(session.end_time)
        .bind(session.final_cost_cents)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes back a lifecycle transition, guarded on the status the
    /// caller observed when it loaded the row.
    ///
    /// Returns true iff this call performed the write.
    pub async fn update_lifecycle_tx(
        conn: &mut SqliteConnection,
        session: &Session,
        expected: SessionStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET status = ?2, gaming_mode = ?3, paused_at = ?4,
                    total_paused_ms = ?5, end_time = ?6, final_cost_cents = ?7, updated_at = ?8
             WHERE id = ?1 AND status = ?9",
        )
        .bind(&session.id)
        .bind(session.status.as_str())
        .bind(session.gaming_mode.as_str())
        .bind(session.paused_at)
        .bind(session.total_paused_ms)
        .bind(session.end_time)
        .bind(session.final_cost_cents)
        .bind(session.updated_at)
        .bind(expected.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Appends a tab line. Lines are insert-only.
    pub async fn insert_item_tx(conn: &mut SqliteConnection, item: &SessionItem) -> DbResult<()> {
        debug!(session_id = %item.session_id, product_id = %item.product_id, "Adding tab line");

        sqlx::query(
            "INSERT INTO session_items (id, session_id, product_id, name_snapshot, quantity,
                                        unit_price_cents, line_total_cents, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&item.id)
        .bind(&item.session_id)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets the running tab using an open transaction's connection.
    pub async fn items_tx(
        conn: &mut SqliteConnection,
        session_id: &str,
    ) -> DbResult<Vec<SessionItem>> {
        let rows: Vec<SessionItemRow> = sqlx::query_as(&format!(
            "SELECT {SESSION_ITEM_COLUMNS} FROM session_items WHERE session_id = ?1 ORDER BY created_at"
        ))
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(SessionItem::from).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
