//! # Validation Module
//!
//! Field validation for incoming car and engine requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor                                               │
//! │  └── JSON shape / types (deserialization)                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Service (Rust)                                               │
//! │  └── THIS MODULE: domain rules, first failure wins                     │
//! │           │          (no transaction is opened on failure)              │
//! │           ▼                                                             │
//! │  Layer 3: Store (SQLite)                                               │
//! │  ├── engine existence check inside the car-create transaction          │
//! │  └── FOREIGN KEY / NOT NULL constraints                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use carzone_core::validation::{validate_fuel_type, validate_year_at};
//!
//! assert!(validate_fuel_type("Diesel").is_ok());
//! assert!(validate_year_at("1885", 2024).is_err());
//! ```

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::error::{ValidationError, ValidationResult};
use crate::types::{CarRequest, Engine, EngineRequest, FuelType};
use crate::MIN_CAR_YEAR;

// =============================================================================
// Car Validators
// =============================================================================

/// Validates a car create/update request.
///
/// Checks run in order and the first failure is returned:
/// name, year, fuel type, engine reference, price.
pub fn validate_car_request(request: &CarRequest) -> ValidationResult<()> {
    validate_car_request_at(request, current_year())
}

/// Same as [`validate_car_request`] with an explicit "current" year.
pub fn validate_car_request_at(request: &CarRequest, current_year: i32) -> ValidationResult<()> {
    validate_name(&request.name)?;
    validate_year_at(&request.year, current_year)?;
    validate_fuel_type(&request.fuel_type)?;
    validate_engine_reference(&request.engine)?;
    validate_price(request.price)?;
    Ok(())
}

/// Validates a car name.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    Ok(())
}

/// Validates a manufacture year against the current calendar year.
pub fn validate_year(year: &str) -> ValidationResult<i32> {
    validate_year_at(year, current_year())
}

/// Validates a manufacture year against `current_year`.
///
/// ## Rules
/// - Must not be empty
/// - Must be numeric
/// - Must be within `[1886, current_year]`
///
/// ## Returns
/// The parsed year.
pub fn validate_year_at(year: &str, current_year: i32) -> ValidationResult<i32> {
    let year = year.trim();

    if year.is_empty() {
        return Err(ValidationError::Required {
            field: "year".to_string(),
        });
    }

    let parsed: i32 = year.parse().map_err(|_| ValidationError::InvalidFormat {
        field: "year".to_string(),
        reason: "must be a valid number".to_string(),
    })?;

    if parsed < MIN_CAR_YEAR || parsed > current_year {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: i64::from(MIN_CAR_YEAR),
            max: i64::from(current_year),
        });
    }

    Ok(parsed)
}

/// Validates a fuel type string, returning the parsed enum.
///
/// Exactly `Petrol`, `Diesel`, `Electric` and `Hybrid` are accepted.
pub fn validate_fuel_type(fuel_type: &str) -> ValidationResult<FuelType> {
    fuel_type
        .parse::<FuelType>()
        .map_err(|_| ValidationError::NotAllowed {
            field: "fuel_type".to_string(),
            allowed: FuelType::ALL.iter().map(|f| f.to_string()).collect(),
        })
}

/// Validates that a car names an engine.
///
/// Existence of that engine is checked by the store, inside the
/// creating transaction.
pub fn validate_engine_reference(engine: &Engine) -> ValidationResult<()> {
    if engine.engine_id.is_nil() {
        return Err(ValidationError::Required {
            field: "engine_id".to_string(),
        });
    }

    Ok(())
}

/// Validates a price. Must be strictly positive (NaN is rejected).
pub fn validate_price(price: f64) -> ValidationResult<()> {
    if !(price > 0.0) {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Engine Validators
// =============================================================================

/// Validates an engine create/update request.
///
/// ## Rules
/// - displacement > 0
/// - no_of_cylinders > 0
/// - car_range > 0
pub fn validate_engine_request(request: &EngineRequest) -> ValidationResult<()> {
    if request.displacement <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "displacement".to_string(),
        });
    }

    if request.no_of_cylinders <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "no_of_cylinders".to_string(),
        });
    }

    if request.car_range <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "car_range".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Parses a resource identifier taken from a request path.
///
/// ## Example
/// ```rust
/// use carzone_core::validation::parse_id;
///
/// assert!(parse_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(parse_id("not-a-uuid").is_err());
/// ```
pub fn parse_id(id: &str) -> ValidationResult<Uuid> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })
}

fn current_year() -> i32 {
    Utc::now().year()
}

// =============================================================================
// Unit Tests
// =============================================================================
