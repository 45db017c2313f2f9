//! # arcadia-core: Pure Business Logic for Arcadia POS
//!
//! This crate is the **heart** of Arcadia POS, a point-of-sale and
//! rental-time-tracking backend for a gaming lounge. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Arcadia POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  arcadia-engine (Engines)                       │   │
//! │  │    SessionEngine: start / pause / resume / end / add_item       │   │
//! │  │    CheckoutEngine: atomic checkout + receipt                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ arcadia-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  session  │  │  billing  │  │   │
//! │  │   │  Console  │  │   Money   │  │  Session  │  │ durations │  │   │
//! │  │   │  Receipt  │  │  TaxCalc  │  │   state   │  │   costs   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   arcadia-db (Database Layer)                   │   │
//! │  │            SQLite queries, migrations, repositories             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Console, Product, Receipt, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`session`] - The session state machine and time accounting
//! - [`billing`] - Duration netting and hourly cost math
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **No Clock**: Every time-dependent operation takes `now` as a parameter
//! 4. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 5. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use arcadia_core::money::Money;
//! use arcadia_core::session::Session;
//! use arcadia_core::types::GamingMode;
//!
//! let t0 = Utc::now();
//! let mut session = Session::start("s1", "c1", GamingMode::OneVsOne, t0);
//!
//! // One hour of play at $8.00/hour
//! let cost = session
//!     .end(t0 + Duration::hours(1), Money::from_cents(800))
//!     .unwrap();
//! assert_eq!(cost.cents(), 800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod billing;
pub mod error;
pub mod money;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use arcadia_core::Money` instead of
// `use arcadia_core::money::Money`

pub use billing::CostPreview;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use session::Session;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum retail lines allowed in a single checkout cart or session tab
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in a cart or tab line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
