//! # Schema Bootstrap
//!
//! The store runs against one fixed schema. This module only makes sure
//! that schema exists; every statement is `IF NOT EXISTS`, so running it
//! against an already-provisioned database changes nothing.
//!
//! ## Tables
//! ```text
//! ┌───────────────────────┐          ┌───────────────────────┐
//! │ engine                │          │ cars                  │
//! │ ───────────────────── │          │ ───────────────────── │
//! │ engine_id  TEXT  PK   │◄─────────│ engine_id  TEXT  FK   │
//! │ displacement INTEGER  │          │ id         TEXT  PK   │
//! │ no_of_cylinders INT   │          │ name, year, brand     │
//! │ car_range  INTEGER    │          │ fuel_type, price      │
//! └───────────────────────┘          │ created_at, updated_at│
//!                                    └───────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// DDL for the car/engine schema.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS engine (
    engine_id       TEXT    PRIMARY KEY NOT NULL,
    displacement    INTEGER NOT NULL CHECK (displacement > 0),
    no_of_cylinders INTEGER NOT NULL CHECK (no_of_cylinders > 0),
    car_range       INTEGER NOT NULL CHECK (car_range > 0)
);

CREATE TABLE IF NOT EXISTS cars (
    id          TEXT    PRIMARY KEY NOT NULL,
    name        TEXT    NOT NULL,
    year        TEXT    NOT NULL,
    brand       TEXT    NOT NULL,
    fuel_type   TEXT    NOT NULL CHECK (fuel_type IN ('Petrol', 'Diesel', 'Electric', 'Hybrid')),
    engine_id   TEXT    NOT NULL REFERENCES engine (engine_id),
    price       REAL    NOT NULL CHECK (price > 0),
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cars_brand ON cars (brand);
CREATE INDEX IF NOT EXISTS idx_cars_engine_id ON cars (engine_id);
"#;

/// Applies [`SCHEMA`] to the pool.
pub async fn apply(pool: &SqlitePool) -> DbResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DbError::SchemaFailed(e.to_string()))?;

    debug!("Schema bootstrap applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        // Already applied once by Database::new.
        db.ensure_schema().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('cars', 'engine') ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        assert_eq!(tables, vec!["cars".to_string(), "engine".to_string()]);
    }
}
