//! # Car Repository
//!
//! Transactional persistence for cars and their engine references.
//!
//! ## Read Shapes
//! ```text
//! get_by_id / delete      cars LEFT JOIN engine  → Car { engine: Some(..) }
//! get_by_brand(.., true)  cars LEFT JOIN engine  → Car { engine: Some(..) }
//! get_by_brand(.., false) cars only              → Car { engine: None }
//! ```
//!
//! ## Not-found Policy
//! `get_by_id` reports an absent car as `Ok(None)`. Update and delete of an
//! absent car fail with [`DbError::NotFound`].

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use carzone_core::{Car, CarRequest, Engine, FuelType};

use crate::context::OpContext;
use crate::error::{DbError, DbResult};
use crate::transaction::ScopedTx;

const SELECT_WITH_ENGINE: &str = r#"
    SELECT c.id, c.name, c.year, c.brand, c.fuel_type, c.price,
           c.created_at, c.updated_at,
           e.engine_id, e.displacement, e.no_of_cylinders, e.car_range
    FROM cars c
    LEFT JOIN engine e ON e.engine_id = c.engine_id
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// One row of `cars`, optionally joined with its engine.
///
/// The engine columns are absent from the brand listing without engines,
/// hence `#[sqlx(default)]`.
#[derive(Debug, sqlx::FromRow)]
struct CarRecord {
    id: String,
    name: String,
    year: String,
    brand: String,
    fuel_type: FuelType,
    price: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    #[sqlx(default)]
    engine_id: Option<String>,
    #[sqlx(default)]
    displacement: Option<i64>,
    #[sqlx(default)]
    no_of_cylinders: Option<i32>,
    #[sqlx(default)]
    car_range: Option<i64>,
}

fn parse_uuid(column: &str, raw: &str) -> DbResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| DbError::Internal(format!("corrupt {column} '{raw}': {e}")))
}

impl TryFrom<CarRecord> for Car {
    type Error = DbError;

    fn try_from(record: CarRecord) -> DbResult<Self> {
        let engine = match (
            record.engine_id,
            record.displacement,
            record.no_of_cylinders,
            record.car_range,
        ) {
            (Some(engine_id), Some(displacement), Some(no_of_cylinders), Some(car_range)) => {
                Some(Engine {
                    engine_id: parse_uuid("engine_id", &engine_id)?,
                    displacement,
                    no_of_cylinders,
                    car_range,
                })
            }
            _ => None,
        };

        Ok(Car {
            id: parse_uuid("car id", &record.id)?,
            name: record.name,
            year: record.year,
            brand: record.brand,
            fuel_type: record.fuel_type,
            engine,
            price: record.price,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for car database operations.
///
/// ## Usage
/// ```rust,ignore
/// let cars = db.cars();
/// let car = cars.create(&ctx, &request).await?;
/// let fords = cars.get_by_brand(&ctx, "Ford", true).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CarRepository {
    pool: SqlitePool,
}

impl CarRepository {
    /// Creates a new CarRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CarRepository { pool }
    }

    /// Gets a car, joined with its engine, by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(car))` - Car found
    /// * `Ok(None)` - No car with this id
    pub async fn get_by_id(&self, ctx: &OpContext, id: Uuid) -> DbResult<Option<Car>> {
        const OP: &str = "car.get_by_id";

        ctx.run(OP, async {
            let mut tx = ScopedTx::begin(&self.pool, OP).await?;
            let car = fetch_car(tx.conn()?, id).await?;
            tx.commit().await?;
            Ok(car)
        })
        .await
    }

    /// Lists every car of `brand`, oldest first.
    ///
    /// With `include_engine` each car carries its joined engine; without it
    /// the engine is left out entirely.
    pub async fn get_by_brand(
        &self,
        ctx: &OpContext,
        brand: &str,
        include_engine: bool,
    ) -> DbResult<Vec<Car>> {
        const OP: &str = "car.get_by_brand";

        ctx.run(OP, async {
            let mut tx = ScopedTx::begin(&self.pool, OP).await?;

            let records = if include_engine {
                let sql = format!("{SELECT_WITH_ENGINE} WHERE c.brand = ?1 ORDER BY c.created_at, c.id");
                sqlx::query_as::<_, CarRecord>(&sql)
                    .bind(brand)
                    .fetch_all(tx.conn()?)
                    .await?
            } else {
                sqlx::query_as::<_, CarRecord>(
                    r#"
                    SELECT id, name, year, brand, fuel_type, price, created_at, updated_at
                    FROM cars
                    WHERE brand = ?1
                    ORDER BY created_at, id
                    "#,
                )
                .bind(brand)
                .fetch_all(tx.conn()?)
                .await?
            };

            tx.commit().await?;

            debug!(brand, include_engine, count = records.len(), "Listed cars by brand");
            records.into_iter().map(Car::try_from).collect()
        })
        .await
    }

    /// Inserts a new car referencing an existing engine.
    ///
    /// ## What This Does
    /// 1. Checks, inside the transaction, that the engine exists
    /// 2. Inserts the car with `created_at = updated_at = now`
    /// 3. Commits and returns the car, engine copied from the request
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - The engine does not exist
    ///   (nothing inserted)
    pub async fn create(&self, ctx: &OpContext, request: &CarRequest) -> DbResult<Car> {
        const OP: &str = "car.create";

        ctx.run(OP, async {
            let fuel_type: FuelType = request
                .fuel_type
                .parse()
                .map_err(|e| DbError::Internal(format!("{OP}: {e}")))?;
            let engine_id = request.engine.engine_id;

            let mut tx = ScopedTx::begin_write(&self.pool, OP).await?;

            let engine_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM engine WHERE engine_id = ?1)")
                    .bind(engine_id.to_string())
                    .fetch_one(tx.conn()?)
                    .await?;

            if !engine_exists {
                warn!(engine_id = %engine_id, "Car references a missing engine");
                return Err(DbError::foreign_key(format!(
                    "engine {engine_id} does not exist"
                )));
            }

            let id = Uuid::new_v4();
            let now = Utc::now();

            sqlx::query(
                r#"
                INSERT INTO cars (id, name, year, brand, fuel_type, engine_id, price, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                "#,
            )
            .bind(id.to_string())
            .bind(&request.name)
            .bind(&request.year)
            .bind(&request.brand)
            .bind(fuel_type)
            .bind(engine_id.to_string())
            .bind(request.price)
            .bind(now)
            .execute(tx.conn()?)
            .await?;

            tx.commit().await?;

            info!(car_id = %id, engine_id = %engine_id, brand = %request.brand, "Car created");

            Ok(Car {
                id,
                name: request.name.clone(),
                year: request.year.clone(),
                brand: request.brand.clone(),
                fuel_type,
                engine: Some(request.engine.clone()),
                price: request.price,
                created_at: now,
                updated_at: now,
            })
        })
        .await
    }

    /// Updates the scalar fields of a car and refreshes `updated_at`.
    ///
    /// The engine reference is never changed here.
    ///
    /// ## Returns
    /// * `Ok(Car)` - The car as stored after the update
    /// * `Err(DbError::NotFound)` - No car with this id (nothing written)
    pub async fn update(&self, ctx: &OpContext, id: Uuid, request: &CarRequest) -> DbResult<Car> {
        const OP: &str = "car.update";

        ctx.run(OP, async {
            let fuel_type: FuelType = request
                .fuel_type
                .parse()
                .map_err(|e| DbError::Internal(format!("{OP}: {e}")))?;

            let mut tx = ScopedTx::begin_write(&self.pool, OP).await?;

            let result = sqlx::query(
                r#"
                UPDATE cars
                SET name = ?1, year = ?2, brand = ?3, fuel_type = ?4, price = ?5, updated_at = ?6
                WHERE id = ?7
                "#,
            )
            .bind(&request.name)
            .bind(&request.year)
            .bind(&request.brand)
            .bind(fuel_type)
            .bind(request.price)
            .bind(Utc::now())
            .bind(id.to_string())
            .execute(tx.conn()?)
            .await?;

            if result.rows_affected() == 0 {
                debug!(car_id = %id, "Update matched no car");
                return Err(DbError::not_found("Car", id));
            }

            let car = fetch_car(tx.conn()?, id)
                .await?
                .ok_or_else(|| DbError::not_found("Car", id))?;

            tx.commit().await?;

            info!(car_id = %id, "Car updated");
            Ok(car)
        })
        .await
    }

    /// Deletes a car and returns it as it was before deletion.
    ///
    /// The referenced engine is left in place.
    ///
    /// ## Returns
    /// * `Ok(Car)` - Snapshot of the deleted car, with its engine
    /// * `Err(DbError::NotFound)` - No car with this id
    /// * `Err(DbError::Conflict)` - The row vanished between read and delete
    pub async fn delete(&self, ctx: &OpContext, id: Uuid) -> DbResult<Car> {
        const OP: &str = "car.delete";

        ctx.run(OP, async {
            let mut tx = ScopedTx::begin_write(&self.pool, OP).await?;

            let snapshot = fetch_car(tx.conn()?, id)
                .await?
                .ok_or_else(|| DbError::not_found("Car", id))?;

            let result = sqlx::query("DELETE FROM cars WHERE id = ?1")
                .bind(id.to_string())
                .execute(tx.conn()?)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::conflict(format!("car {id} was removed concurrently")));
            }

            tx.commit().await?;

            info!(car_id = %id, "Car deleted");
            Ok(snapshot)
        })
        .await
    }
}

async fn fetch_car(conn: &mut SqliteConnection, id: Uuid) -> DbResult<Option<Car>> {
    let sql = format!("{SELECT_WITH_ENGINE} WHERE c.id = ?1");
    let record = sqlx::query_as::<_, CarRecord>(&sql)
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;

    record.map(Car::try_from).transpose()
}

// =============================================================================
// Unit Tests
// =============================================================================
