//! # carzone-db: Database Layer for Carzone
//!
//! This crate provides persistence for cars and engines.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Carzone Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /cars)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     carzone-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  OpContext   │  │   │
//! │  │   │   (pool.rs)   │    │  (car.rs)     │    │  ScopedTx    │  │   │
//! │  │   │               │    │  (engine.rs)  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CarRepo       │───►│ cancel +     │  │   │
//! │  │   │ Schema        │    │ EngineRepo    │    │ rollback     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`schema`] - Idempotent schema bootstrap
//! - [`context`] - Cancellation and deadlines for store calls
//! - [`transaction`] - Scoped (rollback-on-drop) transactions
//! - [`error`] - Database error types
//! - [`repository`] - Car and engine repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use carzone_db::{Database, DbConfig, OpContext};
//!
//! let db = Database::new(DbConfig::new("carzone.db")).await?;
//!
//! let ctx = OpContext::new().with_timeout(Duration::from_secs(30));
//! let fords = db.cars().get_by_brand(&ctx, "Ford", true).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod context;
pub mod error;
pub mod pool;
pub mod repository;
pub mod schema;
pub mod transaction;

// =============================================================================
// Re-exports
// =============================================================================

pub use context::OpContext;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use transaction::ScopedTx;

// Repository re-exports for convenience
pub use repository::car::CarRepository;
pub use repository::engine::EngineRepository;
