//! # Domain Types
//!
//! Core domain types used throughout Carzone.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐         ┌─────────────────┐                       │
//! │  │      Car        │         │     Engine      │                       │
//! │  │  ─────────────  │  ref    │  ─────────────  │                       │
//! │  │  id (UUID)      │ ──────► │  engine_id      │                       │
//! │  │  name, brand    │         │  displacement   │                       │
//! │  │  year, price    │         │  no_of_cylinders│                       │
//! │  │  fuel_type      │         │  car_range      │                       │
//! │  └─────────────────┘         └─────────────────┘                       │
//! │                                                                         │
//! │  A car holds a *reference* to its engine. Deleting a car never          │
//! │  deletes the engine; an engine must exist before a car names it.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Fuel Type
// =============================================================================

/// Fuel a car runs on.
///
/// Stored and serialized with the exact variant name (`"Petrol"`, ...).
/// Parsing is case-sensitive.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
}

impl FuelType {
    /// Every accepted fuel type, in declaration order.
    pub const ALL: [FuelType; 4] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Electric,
        FuelType::Hybrid,
    ];

    /// Returns the canonical name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Electric => "Electric",
            FuelType::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the accepted fuel types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFuelType(pub String);

impl fmt::Display for UnknownFuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown fuel type: {}", self.0)
    }
}

impl std::error::Error for UnknownFuelType {}

impl FromStr for FuelType {
    type Err = UnknownFuelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FuelType::ALL
            .into_iter()
            .find(|fuel| fuel.as_str() == s)
            .ok_or_else(|| UnknownFuelType(s.to_string()))
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A power unit that cars reference.
///
/// Missing fields deserialize to zero so a car request may name an engine
/// by `engine_id` alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Engine {
    /// Unique identifier, immutable once created.
    pub engine_id: Uuid,

    /// Displacement in cubic centimetres.
    pub displacement: i64,

    /// Number of cylinders.
    pub no_of_cylinders: i32,

    /// Range on a full tank/charge, in kilometres.
    pub car_range: i64,
}

/// Payload for creating or updating an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    pub displacement: i64,
    pub no_of_cylinders: i32,
    pub car_range: i64,
}

impl EngineRequest {
    /// Builds the engine record this request describes under `engine_id`.
    pub fn into_engine(self, engine_id: Uuid) -> Engine {
        Engine {
            engine_id,
            displacement: self.displacement,
            no_of_cylinders: self.no_of_cylinders,
            car_range: self.car_range,
        }
    }
}

// =============================================================================
// Car
// =============================================================================

/// A vehicle in the inventory.
///
/// `engine` is `None` when the car was read without its engine (brand
/// listing with `isEngine=false`); the field is then omitted from JSON
/// rather than zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
    /// Unique identifier (UUID v4), assigned by the store.
    pub id: Uuid,

    pub name: String,

    /// Four-digit manufacture year, kept as submitted.
    pub year: String,

    pub brand: String,

    pub fuel_type: FuelType,

    /// Referenced engine, when loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Engine>,

    /// Price; always strictly positive.
    pub price: f64,

    /// Set once on insert, never mutated.
    pub created_at: DateTime<Utc>,

    /// Refreshed on every successful mutation.
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or updating a car.
///
/// `fuel_type` stays a raw string here so an unknown value surfaces as a
/// validation error instead of a decoding failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRequest {
    pub name: String,
    pub year: String,
    pub brand: String,
    pub fuel_type: String,
    pub engine: Engine,
    pub price: f64,
}

// =============================================================================
// Credentials
// =============================================================================

/// Username/password pair submitted to the login endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
