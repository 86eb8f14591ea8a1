//! # Repository Module
//!
//! Database repository implementations for Carzone.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (carzone-api)                                                 │
//! │       │                                                                 │
//! │       │  db.cars().create(&ctx, &request)                              │
//! │       ▼                                                                 │
//! │  CarRepository / EngineRepository                                      │
//! │  ├── every call runs under an OpContext (cancel + deadline)            │
//! │  └── every mutation runs inside one ScopedTx                           │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CarRepository`](car::CarRepository) - Car CRUD and brand listing
//! - [`EngineRepository`](engine::EngineRepository) - Engine CRUD

pub mod car;
pub mod engine;
