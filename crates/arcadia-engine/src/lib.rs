//! # arcadia-engine: The Engines of Arcadia POS
//!
//! This crate composes [`arcadia_core`] (pure rules) and [`arcadia_db`]
//! (storage) into the two transactional engines of the system.
//!
//! ## The Two Engines
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         arcadia-engine                                  │
//! │                                                                         │
//! │  ┌──────────────────────────────┐  ┌──────────────────────────────┐   │
//! │  │        SessionEngine         │  │       CheckoutEngine         │   │
//! │  │  ──────────────────────────  │  │  ──────────────────────────  │   │
//! │  │  start    (claims console)   │  │  checkout (atomic):          │   │
//! │  │  pause / resume              │  │    session charge            │   │
//! │  │  change_gaming_mode          │──►    + manual override         │   │
//! │  │  end      (freezes cost,     │  │    + running tab             │   │
//! │  │            releases console) │  │    + cart items              │   │
//! │  │  add_item (running tab)      │  │    → one immutable receipt   │   │
//! │  │  cost_preview (read-only)    │  │  get / exists_for_session    │   │
//! │  └──────────────────────────────┘  └──────────────────────────────┘   │
//! │                                                                         │
//! │  Shared resource: the relational store. Every operation is one         │
//! │  transaction; consistency comes from transaction scope + guarded       │
//! │  writes, never from in-memory locks.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arcadia_db::{Database, DbConfig};
//! use arcadia_engine::{CheckoutEngine, SessionEngine};
//! use arcadia_core::types::GamingMode;
//!
//! let db = Database::new(DbConfig::new("./arcadia.db")).await?;
//! let sessions = SessionEngine::new(db.clone());
//! let checkout = CheckoutEngine::new(db);
//!
//! let session = sessions.start(&console_id, GamingMode::OneVsOne).await?;
//! // ... play, pause, snack ...
//! let session = sessions.end(&session.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{BillingPolicy, CartLine, CheckoutEngine, CheckoutRequest};
pub use error::{EngineError, EngineResult};
pub use session::SessionEngine;
