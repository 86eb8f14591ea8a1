//! # Engine Repository
//!
//! Transactional persistence for engine records.
//!
//! ## Not-found Policy
//! Reads, updates and deletes of an unknown engine id fail with
//! [`DbError::NotFound`]. Deleting an engine that cars still reference
//! fails with [`DbError::Conflict`] and leaves both tables untouched.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use carzone_core::{Engine, EngineRequest};

use crate::context::OpContext;
use crate::error::{DbError, DbResult};
use crate::transaction::ScopedTx;

/// Row shape of the `engine` table.
#[derive(Debug, sqlx::FromRow)]
struct EngineRecord {
    engine_id: String,
    displacement: i64,
    no_of_cylinders: i32,
    car_range: i64,
}

impl TryFrom<EngineRecord> for Engine {
    type Error = DbError;

    fn try_from(record: EngineRecord) -> DbResult<Self> {
        let engine_id = Uuid::parse_str(&record.engine_id).map_err(|e| {
            DbError::Internal(format!("corrupt engine_id '{}': {e}", record.engine_id))
        })?;

        Ok(Engine {
            engine_id,
            displacement: record.displacement,
            no_of_cylinders: record.no_of_cylinders,
            car_range: record.car_range,
        })
    }
}

/// Repository for engine database operations.
///
/// ## Usage
/// ```rust,ignore
/// let engines = db.engines();
/// let engine = engines.create(&ctx, &request).await?;
/// let same = engines.get_by_id(&ctx, engine.engine_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct EngineRepository {
    pool: SqlitePool,
}

impl EngineRepository {
    /// Creates a new EngineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EngineRepository { pool }
    }

    /// Gets an engine by its ID.
    ///
    /// ## Returns
    /// * `Ok(Engine)` - Engine found
    /// * `Err(DbError::NotFound)` - No engine with this id
    pub async fn get_by_id(&self, ctx: &OpContext, id: Uuid) -> DbResult<Engine> {
        const OP: &str = "engine.get_by_id";

        ctx.run(OP, async {
            let mut tx = ScopedTx::begin(&self.pool, OP).await?;
            let engine = fetch_engine(tx.conn()?, id)
                .await?
                .ok_or_else(|| DbError::not_found("Engine", id))?;
            tx.commit().await?;
            Ok(engine)
        })
        .await
    }

    /// Inserts a new engine under a freshly generated id.
    pub async fn create(&self, ctx: &OpContext, request: &EngineRequest) -> DbResult<Engine> {
        const OP: &str = "engine.create";

        ctx.run(OP, async {
            let engine = request.clone().into_engine(Uuid::new_v4());

            let mut tx = ScopedTx::begin_write(&self.pool, OP).await?;
            sqlx::query(
                r#"
                INSERT INTO engine (engine_id, displacement, no_of_cylinders, car_range)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(engine.engine_id.to_string())
            .bind(engine.displacement)
            .bind(engine.no_of_cylinders)
            .bind(engine.car_range)
            .execute(tx.conn()?)
            .await?;
            tx.commit().await?;

            info!(engine_id = %engine.engine_id, "Engine created");
            Ok(engine)
        })
        .await
    }

    /// Replaces displacement, cylinders and range of an existing engine.
    ///
    /// ## Returns
    /// * `Ok(Engine)` - The engine as stored after the update
    /// * `Err(DbError::NotFound)` - No engine with this id (nothing written)
    pub async fn update(
        &self,
        ctx: &OpContext,
        id: Uuid,
        request: &EngineRequest,
    ) -> DbResult<Engine> {
        const OP: &str = "engine.update";

        ctx.run(OP, async {
            let mut tx = ScopedTx::begin_write(&self.pool, OP).await?;
            let result = sqlx::query(
                r#"
                UPDATE engine
                SET displacement = ?1, no_of_cylinders = ?2, car_range = ?3
                WHERE engine_id = ?4
                "#,
            )
            .bind(request.displacement)
            .bind(request.no_of_cylinders)
            .bind(request.car_range)
            .bind(id.to_string())
            .execute(tx.conn()?)
            .await?;

            if result.rows_affected() == 0 {
                debug!(engine_id = %id, "Update matched no engine");
                return Err(DbError::not_found("Engine", id));
            }

            tx.commit().await?;

            info!(engine_id = %id, "Engine updated");
            Ok(request.clone().into_engine(id))
        })
        .await
    }

    /// Deletes an engine and returns the row as it was before deletion.
    ///
    /// ## Returns
    /// * `Ok(Engine)` - Snapshot of the deleted engine
    /// * `Err(DbError::NotFound)` - No engine with this id
    /// * `Err(DbError::Conflict)` - Cars still reference the engine, or a
    ///   concurrent delete removed it between read and delete
    pub async fn delete(&self, ctx: &OpContext, id: Uuid) -> DbResult<Engine> {
        const OP: &str = "engine.delete";

        ctx.run(OP, async {
            let mut tx = ScopedTx::begin_write(&self.pool, OP).await?;

            let snapshot = fetch_engine(tx.conn()?, id)
                .await?
                .ok_or_else(|| DbError::not_found("Engine", id))?;

            let referencing: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM cars WHERE engine_id = ?1")
                    .bind(id.to_string())
                    .fetch_one(tx.conn()?)
                    .await?;

            if referencing > 0 {
                warn!(engine_id = %id, referencing, "Refusing to delete referenced engine");
                return Err(DbError::conflict(format!(
                    "engine {id} is still referenced by {referencing} car(s)"
                )));
            }

            let result = sqlx::query("DELETE FROM engine WHERE engine_id = ?1")
                .bind(id.to_string())
                .execute(tx.conn()?)
                .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::conflict(format!(
                    "engine {id} was removed concurrently"
                )));
            }

            tx.commit().await?;

            info!(engine_id = %id, "Engine deleted");
            Ok(snapshot)
        })
        .await
    }
}

async fn fetch_engine(conn: &mut SqliteConnection, id: Uuid) -> DbResult<Option<Engine>> {
    let record = sqlx::query_as::<_, EngineRecord>(
        r#"
        SELECT engine_id, displacement, no_of_cylinders, car_range
        FROM engine
        WHERE engine_id = ?1
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;

    record.map(Engine::try_from).transpose()
}
