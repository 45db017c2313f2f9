//! # Repository Module
//!
//! Repository implementations for database operations.
//!
//! ## Two Call Shapes
//! Each repository exposes:
//! - Pool-based methods on the struct for plain reads and standalone
//!   writes (`repo.get_by_id(...)`)
//! - Associated functions taking `&mut SqliteConnection` for the engines'
//!   transactional critical sections (`Repo::claim_for_session(tx, ...)`),
//!   so several guarded writes can share one atomic transaction

pub mod console;
pub mod product;
pub mod receipt;
pub mod session;
