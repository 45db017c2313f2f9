//! # arcadia-db: Database Layer for Arcadia POS
//!
//! This crate provides database access for the Arcadia POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Arcadia POS Data Flow                             │
//! │                                                                         │
//! │  Engine operation (start_session, checkout, ...)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    arcadia-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ console.rs    │    │  (embedded)  │  │   │
//! │  │   │               │    │ product.rs    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ session.rs    │    │ 001_init.sql │  │   │
//! │  │   │ Transactions  │    │ receipt.rs    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   rows.rs: FromRow structs + the single TEXT ↔ enum boundary   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`rows`] - Row structs and the storage ↔ domain boundary mapping
//! - [`repository`] - Repository implementations (console, product, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arcadia_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/arcadia.db")).await?;
//! let consoles = db.consoles().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod rows;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::console::{ConsoleRepository, NewConsole};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::receipt::ReceiptRepository;
pub use repository::session::SessionRepository;
