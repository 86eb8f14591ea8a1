//! # carzone-core: Pure Domain Logic for Carzone
//!
//! Domain types and validation rules for the car/engine inventory service.
//! Every function here is pure; there is no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Carzone Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    carzone-api (HTTP)                           │   │
//! │  │    login, /cars, /car/{id}, /engine, /metrics                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ carzone-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                  │   │
//! │  │   │   types   │  │ validation│  │   error   │                  │   │
//! │  │   │   Car     │  │ car/engine│  │ Validation│                  │   │
//! │  │   │   Engine  │  │  requests │  │   Error   │                  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  carzone-db (Database Layer)                    │   │
//! │  │          SQLite pool, scoped transactions, repositories         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Car, Engine, requests, FuelType)
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation for incoming requests
//!
//! ## Example Usage
//!
//! ```rust
//! use carzone_core::validation::validate_engine_request;
//! use carzone_core::EngineRequest;
//!
//! let request = EngineRequest {
//!     displacement: 2000,
//!     no_of_cylinders: 4,
//!     car_range: 600,
//! };
//! assert!(validate_engine_request(&request).is_ok());
//! ```

pub mod error;
pub mod types;
pub mod validation;

pub use error::{ValidationError, ValidationResult};
pub use types::*;

/// Earliest accepted manufacture year (the first patented automobile).
pub const MIN_CAR_YEAR: i32 = 1886;
