//! # Session Engine
//!
//! Orchestrates the rental-session lifecycle against the shared store.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Every Lifecycle Operation Is One Transaction               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── load the session/console rows on the transaction's connection   │
//! │    │                                                                    │
//! │    ├── apply the pure transition (arcadia-core::Session)               │
//! │    │      rejects wrong-state calls with typed errors                  │
//! │    │                                                                    │
//! │    ├── write back, guarded on the status that was loaded               │
//! │    │      rows_affected = 0 → a concurrent call won; abort             │
//! │    │                                                                    │
//! │    └── console claim/release rides the same transaction                │
//! │    │                                                                    │
//! │  COMMIT (or rollback on any error)                                     │
//! │                                                                         │
//! │  Cross-entity consistency (console status, session row, tab lines,     │
//! │  stock counts) comes from transaction scope, not in-memory locks:      │
//! │  multiple process instances may run against the same store.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use arcadia_core::billing::CostPreview;
use arcadia_core::types::{GamingMode, SessionItem};
use arcadia_core::validation::validate_quantity;
use arcadia_core::{CoreError, Session};
use arcadia_db::{
    ConsoleRepository, Database, DbError, ProductRepository, SessionRepository,
};

use crate::error::EngineResult;

/// The session lifecycle engine.
///
/// Owns session records for their active lifetime: created on start,
/// mutated on pause/resume/end/mode-change, frozen after end. Cheap to
/// clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct SessionEngine {
    db: Database,
}

impl SessionEngine {
    /// Creates a new SessionEngine on the given database.
    pub fn new(db: Database) -> Self {
        SessionEngine { db }
    }

    /// Starts a session on an available console.
    ///
    /// ## What This Does
    /// 1. Loads the console and checks it is available
    /// 2. Checks the requested mode has a positive rate (2v2 requires
    ///    rate_2v2 > 0)
    /// 3. Claims the console (available → in_use) with a guarded UPDATE
    /// 4. Inserts the new active session
    ///
    /// All in one transaction, so two concurrent starts on the same
    /// console cannot both succeed.
    ///
    /// ## Errors
    /// - `ConsoleUnavailable` if the console is missing or not available
    /// - `UnsupportedMode` if the requested mode has no positive rate
    pub async fn start(&self, console_id: &str, mode: GamingMode) -> EngineResult<Session> {
        debug!(console_id = %console_id, mode = %mode, "start session");

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let console = ConsoleRepository::get_tx(&mut tx, console_id)
            .await?
            .ok_or_else(|| CoreError::ConsoleUnavailable {
                console_id: console_id.to_string(),
                status: "missing".to_string(),
            })?;

        if !console.is_available() {
            return Err(CoreError::ConsoleUnavailable {
                console_id: console_id.to_string(),
                status: console.status.to_string(),
            }
            .into());
        }

        if !console.supports(mode) {
            return Err(CoreError::UnsupportedMode {
                console_id: console_id.to_string(),
                mode,
            }
            .into());
        }

        // The guarded claim is the authoritative availability check; the
        // read above only produces precise errors for the common cases.
        if !ConsoleRepository::claim_for_session(&mut tx, console_id).await? {
            return Err(CoreError::ConsoleUnavailable {
                console_id: console_id.to_string(),
                status: console.status.to_string(),
            }
            .into());
        }

        let session = Session::start(
            Uuid::new_v4().to_string(),
            console_id,
            mode,
            Utc::now(),
        );

        // The partial unique index on open sessions backstops exclusivity
        SessionRepository::insert_tx(&mut tx, &session)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    CoreError::ConsoleUnavailable {
                        console_id: console_id.to_string(),
                        status: "in_use".to_string(),
                    }
                    .into()
                } else {
                    crate::error::EngineError::from(e)
                }
            })?;

        tx.commit().await.map_err(DbError::from)?;

        info!(session_id = %session.id, console_id = %console_id, mode = %mode, "Session started");
        Ok(session)
    }

    /// Pauses the session clock.
    ///
    /// ## Errors
    /// - `SessionNotFound`
    /// - `InvalidTransition` if the session is not active
    pub async fn pause(&self, session_id: &str) -> EngineResult<Session> {
        debug!(session_id = %session_id, "pause session");

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut session = Self::load_tx(&mut tx, session_id).await?;
        let observed = session.status;
        session.pause(Utc::now())?;

        Self::write_back(&mut tx, &session, observed).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(session_id = %session_id, "Session paused");
        Ok(session)
    }

    /// Resumes a paused session, folding the closed pause interval into
    /// the session's paused-time accumulator.
    ///
    /// ## Errors
    /// - `SessionNotFound`
    /// - `InvalidTransition` if the session is not paused
    pub async fn resume(&self, session_id: &str) -> EngineResult<Session> {
        debug!(session_id = %session_id, "resume session");

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut session = Self::load_tx(&mut tx, session_id).await?;
        let observed = session.status;
        session.resume(Utc::now())?;

        Self::write_back(&mut tx, &session, observed).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(session_id = %session_id, paused_ms = session.total_paused_ms, "Session resumed");
        Ok(session)
    }

    /// Switches the session's billing tier.
    ///
    /// Validates the target mode against the console exactly as `start`
    /// does. Elapsed time is not repriced; the mode in effect at end time
    /// bills the whole session.
    ///
    /// ## Errors
    /// - `SessionNotFound`
    /// - `InvalidTransition` if the session has ended
    /// - `UnsupportedMode` if the target mode has no positive rate
    pub async fn change_gaming_mode(
        &self,
        session_id: &str,
        mode: GamingMode,
    ) -> EngineResult<Session> {
        debug!(session_id = %session_id, mode = %mode, "change gaming mode");

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut session = Self::load_tx(&mut tx, session_id).await?;

        let console = ConsoleRepository::get_tx(&mut tx, &session.console_id)
            .await?
            .ok_or_else(|| CoreError::ConsoleNotFound(session.console_id.clone()))?;
        if !console.supports(mode) {
            return Err(CoreError::UnsupportedMode {
                console_id: console.id,
                mode,
            }
            .into());
        }

        let observed = session.status;
        session.change_mode(mode, Utc::now())?;

        Self::write_back(&mut tx, &session, observed).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(session_id = %session_id, mode = %mode, "Gaming mode changed");
        Ok(session)
    }

    /// Ends the session, freezing its duration and cost, and releases the
    /// console back to available.
    ///
    /// The rate used is the console's rate for the mode in effect right
    /// now; paused time (including an open pause interval) is excluded and
    /// the billable duration is clamped to ≥ 0.
    ///
    /// ## Errors
    /// - `SessionNotFound`
    /// - `AlreadyEnded`
    pub async fn end(&self, session_id: &str) -> EngineResult<Session> {
        debug!(session_id = %session_id, "end session");

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let mut session = Self::load_tx(&mut tx, session_id).await?;

        let console = ConsoleRepository::get_tx(&mut tx, &session.console_id)
            .await?
            .ok_or_else(|| CoreError::ConsoleNotFound(session.console_id.clone()))?;
        let rate_used = console.rate_for(session.gaming_mode);

        let observed = session.status;
        let cost = session.end(Utc::now(), rate_used)?;

        Self::write_back(&mut tx, &session, observed).await?;

        // Not guaranteed to flip: a manual maintenance change mid-session
        // stays in force, so the release result is informational only.
        let released =
            ConsoleRepository::release_from_session(&mut tx, &session.console_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = %session_id,
            cost = %cost,
            released,
            "Session ended"
        );
        Ok(session)
    }

    /// Adds a retail line to the session's running tab.
    ///
    /// Valid in any non-ended state. Decrements catalog stock with a
    /// guarded UPDATE and captures the unit price at this moment; later
    /// catalog edits do not touch the line.
    ///
    /// ## Errors
    /// - `SessionNotFound` / `ProductNotFound`
    /// - `InvalidTransition` if the session has ended
    /// - `InsufficientStock` if stock < quantity
    /// - `Validation` if quantity is not positive
    pub async fn add_item(
        &self,
        session_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> EngineResult<SessionItem> {
        debug!(session_id = %session_id, product_id = %product_id, quantity, "add tab item");

        validate_quantity(quantity).map_err(CoreError::from)?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let session = Self::load_tx(&mut tx, session_id).await?;
        if session.is_ended() {
            return Err(CoreError::InvalidTransition {
                session_id: session_id.to_string(),
                current: session.status,
                operation: "add item",
            }
            .into());
        }

        let product = ProductRepository::get_tx(&mut tx, product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !ProductRepository::decrement_stock(&mut tx, product_id, quantity).await? {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: product.current_stock,
                requested: quantity,
            }
            .into());
        }

        let item = SessionItem {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            product_id: product_id.to_string(),
            name_snapshot: product.name.clone(),
            quantity,
            unit_price_cents: product.price_cents,
            line_total_cents: product.price().multiply_quantity(quantity).cents(),
            created_at: Utc::now(),
        };
        SessionRepository::insert_item_tx(&mut tx, &item).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = %session_id,
            product_id = %product_id,
            quantity,
            line_total_cents = item.line_total_cents,
            "Tab line added"
        );
        Ok(item)
    }

    /// Non-mutating as-of-now cost projection under both console rates.
    ///
    /// Uses the same paused-time-exclusion rule as `end`, without
    /// finalizing anything. Neither the session nor the console changes.
    ///
    /// ## Errors
    /// - `SessionNotFound` / `ConsoleNotFound`
    /// - `AlreadyEnded` if the session has ended (its cost is frozen)
    pub async fn cost_preview(&self, session_id: &str) -> EngineResult<CostPreview> {
        let session = self.get(session_id).await?;
        if session.is_ended() {
            return Err(CoreError::AlreadyEnded(session_id.to_string()).into());
        }

        let console = self
            .db
            .consoles()
            .get_by_id(&session.console_id)
            .await?
            .ok_or_else(|| CoreError::ConsoleNotFound(session.console_id.clone()))?;

        Ok(session.preview(
            Utc::now(),
            console.rate_for(GamingMode::OneVsOne),
            console.rate_for(GamingMode::TwoVsTwo),
        ))
    }

    /// Gets a session by ID.
    pub async fn get(&self, session_id: &str) -> EngineResult<Session> {
        self.db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()).into())
    }

    /// Gets a session's running tab, oldest line first.
    pub async fn tab(&self, session_id: &str) -> EngineResult<Vec<SessionItem>> {
        // Surface a typed error for unknown sessions instead of an empty tab
        self.get(session_id).await?;
        Ok(self.db.sessions().items(session_id).await?)
    }

    /// Lists sessions that have not ended, oldest first.
    pub async fn list_open(&self) -> EngineResult<Vec<Session>> {
        Ok(self.db.sessions().list_open().await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load_tx(
        conn: &mut sqlx::SqliteConnection,
        session_id: &str,
    ) -> EngineResult<Session> {
        SessionRepository::get_tx(conn, session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()).into())
    }

    /// Guarded write-back. A failed guard means a concurrent call
    /// transitioned the row after we loaded it; the transaction aborts and
    /// the caller may re-read and retry.
    async fn write_back(
        conn: &mut sqlx::SqliteConnection,
        session: &Session,
        observed: arcadia_core::types::SessionStatus,
    ) -> EngineResult<()> {
        if !SessionRepository::update_lifecycle_tx(conn, session, observed).await? {
            return Err(DbError::TransactionFailed(format!(
                "session {} was modified concurrently",
                session.id
            ))
            .into());
        }
        Ok(())
    }
}
