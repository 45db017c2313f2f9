//! # Console Repository
//!
//! Database operations for the console registry.
//!
//! ## Claim / Release
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Console Exclusivity Under Concurrency                      │
//! │                                                                         │
//! │  Two cashiers start a session on Station 4 at the same instant:        │
//! │                                                                         │
//! │  Call A: UPDATE consoles SET status='in_use'                           │
//! │          WHERE id=? AND status='available'   → rows_affected = 1  ✓    │
//! │                                                                         │
//! │  Call B: UPDATE consoles SET status='in_use'                           │
//! │          WHERE id=? AND status='available'   → rows_affected = 0  ✗    │
//! │                                                                         │
//! │  The status guard in the WHERE clause is the SQLite equivalent of      │
//! │  SELECT ... FOR UPDATE: check and claim are one atomic statement.      │
//! │  The partial unique index on open sessions backstops the invariant.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use arcadia_core::billing::default_rate_2v2;
use arcadia_core::types::{Console, ConsoleStatus};
use arcadia_core::Money;

use crate::error::{DbError, DbResult};
use crate::rows::ConsoleRow;

const CONSOLE_COLUMNS: &str =
    "id, name, console_type, status, rate_1v1_cents, rate_2v2_cents, created_at, updated_at";

/// Parameters for registering a new console.
#[derive(Debug, Clone)]
pub struct NewConsole {
    pub name: String,
    pub console_type: String,
    /// Base hourly rate in cents. Must be positive.
    pub rate_1v1_cents: i64,
    /// Secondary hourly rate in cents. When None, 1.5× the base rate is
    /// computed here and persisted; reads never apply a fallback.
    pub rate_2v2_cents: Option<i64>,
}

/// Repository for console database operations.
#[derive(Debug, Clone)]
pub struct ConsoleRepository {
    pool: SqlitePool,
}

impl ConsoleRepository {
    /// Creates a new ConsoleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConsoleRepository { pool }
    }

    /// Registers a new console, available by default.
    ///
    /// This is the single point where the 2v2 default rate is applied.
    pub async fn insert(&self, new: NewConsole) -> DbResult<Console> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let rate_2v2_cents = new
            .rate_2v2_cents
            .unwrap_or_else(|| default_rate_2v2(Money::from_cents(new.rate_1v1_cents)).cents());

        debug!(id = %id, name = %new.name, "Registering console");

        let console = Console {
            id: id.clone(),
            name: new.name,
            console_type: new.console_type,
            status: ConsoleStatus::Available,
            rate_1v1_cents: new.rate_1v1_cents,
            rate_2v2_cents,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO consoles (id, name, console_type, status, rate_1v1_cents, rate_2v2_cents, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&console.id)
        .bind(&console.name)
        .bind(&console.console_type)
        .bind(console.status.as_str())
        .bind(console.rate_1v1_cents)
        .bind(console.rate_2v2_cents)
        .bind(console.created_at)
        .bind(console.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(console)
    }

    /// Gets a console by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Console>> {
        let row: Option<ConsoleRow> = sqlx::query_as(&format!(
            "SELECT {CONSOLE_COLUMNS} FROM consoles WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Console::try_from).transpose()
    }

    /// Lists all consoles, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Console>> {
        let rows: Vec<ConsoleRow> = sqlx::query_as(&format!(
            "SELECT {CONSOLE_COLUMNS} FROM consoles ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Console::try_from).collect()
    }

    /// Sets a console's status (manual maintenance/reserved flips).
    ///
    /// Session-driven transitions go through [`claim_for_session`] and
    /// [`release_from_session`] instead, inside the engine's transaction.
    ///
    /// [`claim_for_session`]: ConsoleRepository::claim_for_session
    /// [`release_from_session`]: ConsoleRepository::release_from_session
    pub async fn set_status(&self, id: &str, status: ConsoleStatus) -> DbResult<()> {
        debug!(id = %id, status = %status, "Setting console status");

        let result = sqlx::query("UPDATE consoles SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status.as_str())
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Console", id));
        }

        Ok(())
    }

    // =========================================================================
    // Transactional operations (used by the engines)
    // =========================================================================

    /// Gets a console by ID using an open transaction's connection.
    pub async fn get_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Console>> {
        let row: Option<ConsoleRow> = sqlx::query_as(&format!(
            "SELECT {CONSOLE_COLUMNS} FROM consoles WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(Console::try_from).transpose()
    }

    /// Atomically claims an available console for a new session.
    ///
    /// Returns true iff this call performed the available → in_use flip.
    /// Exactly one of any set of concurrent claims can see true.
    pub async fn claim_for_session(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE consoles SET status = 'in_use', updated_at = ?2
             WHERE id = ?1 AND status = 'available'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Releases a console back to available when its session ends.
    ///
    /// Guarded on in_use so a manual maintenance flip made mid-session is
    /// not silently overwritten.
    pub async fn release_from_session(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE consoles SET status = 'available', updated_at = ?2
             WHERE id = ?1 AND status = 'in_use'",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
