//! # Scoped Transactions
//!
//! A unit-of-work guard that guarantees exactly one of commit or rollback.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ScopedTx::begin_write(pool, "car.create")                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  statements via tx.conn()?                                              │
//! │       │                                                                 │
//! │       ├── tx.commit().await   → COMMIT   (guard consumed)               │
//! │       ├── tx.rollback().await → ROLLBACK (guard consumed)               │
//! │       └── guard dropped       → ROLLBACK                                │
//! │              (early `?` return, panic unwind, cancelled future)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let mut tx = ScopedTx::begin_write(&pool, "engine.create").await?;
//! sqlx::query("INSERT INTO engine ...").execute(tx.conn()?).await?;
//! tx.commit().await?;
//! ```

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::error::{is_busy, DbError, DbResult};

/// An open transaction that rolls back unless explicitly committed.
pub struct ScopedTx {
    op: &'static str,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl ScopedTx {
    /// Acquires a pooled connection and opens a deferred transaction on it.
    ///
    /// For read-only units of work. Anything that writes goes through
    /// [`ScopedTx::begin_write`].
    pub async fn begin(pool: &SqlitePool, op: &'static str) -> DbResult<Self> {
        let tx = pool.begin().await.map_err(|e| begin_error(op, e))?;

        debug!(op, "Transaction opened");
        Ok(ScopedTx { op, tx: Some(tx) })
    }

    /// Opens a transaction that holds the write lock from its first statement.
    ///
    /// Uses `BEGIN IMMEDIATE`: concurrent writers queue on the connection's
    /// busy timeout instead of failing a read-then-write upgrade.
    pub async fn begin_write(pool: &SqlitePool, op: &'static str) -> DbResult<Self> {
        let tx = pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| begin_error(op, e))?;

        debug!(op, "Write transaction opened");
        Ok(ScopedTx { op, tx: Some(tx) })
    }

    /// The connection to run statements on.
    pub fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        let op = self.op;
        self.tx
            .as_deref_mut()
            .ok_or_else(|| DbError::TransactionFailed(format!("{op}: transaction already finished")))
    }

    /// Name of the operation this transaction belongs to.
    pub fn op(&self) -> &'static str {
        self.op
    }

    /// Commits the transaction.
    pub async fn commit(mut self) -> DbResult<()> {
        let op = self.op;
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DbError::TransactionFailed(format!("{op}: transaction already finished")))?;

        tx.commit().await.map_err(|e| {
            if is_busy(&e) {
                DbError::from(e)
            } else {
                DbError::TransactionFailed(format!("{op}: commit: {e}"))
            }
        })?;

        debug!(op, "Transaction committed");
        Ok(())
    }

    /// Rolls the transaction back explicitly.
    pub async fn rollback(mut self) -> DbResult<()> {
        let op = self.op;
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };

        tx.rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(format!("{op}: rollback: {e}")))?;

        debug!(op, "Transaction rolled back");
        Ok(())
    }
}

impl Drop for ScopedTx {
    fn drop(&mut self) {
        // The inner sqlx transaction queues a ROLLBACK on its own drop.
        if self.tx.is_some() {
            if std::thread::panicking() {
                warn!(op = self.op, "Panic inside transaction, rolling back");
            } else {
                debug!(op = self.op, "Transaction dropped before commit, rolling back");
            }
        }
    }
}

fn begin_error(op: &'static str, err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
        sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
        other if is_busy(&other) => DbError::from(other),
        other => DbError::TransactionFailed(format!("{op}: begin: {other}")),
    }
}

impl std::fmt::Debug for ScopedTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedTx")
            .field("op", &self.op)
            .field("open", &self.tx.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::context::OpContext;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn insert_engine(tx: &mut ScopedTx, id: &str) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO engine (engine_id, displacement, no_of_cylinders, car_range) VALUES (?1, 1500, 4, 400)",
        )
        .bind(id)
        .execute(tx.conn()?)
        .await?;
        Ok(())
    }

    async fn engine_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM engine")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = test_db().await;

        let mut tx = ScopedTx::begin(db.pool(), "test.commit").await.unwrap();
        insert_engine(&mut tx, "e-1").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(engine_count(db.pool()).await, 1);
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let db = test_db().await;

        {
            let mut tx = ScopedTx::begin(db.pool(), "test.drop").await.unwrap();
            insert_engine(&mut tx, "e-1").await.unwrap();
        }

        assert_eq!(engine_count(db.pool()).await, 0);
    }

    #[tokio::test]
    async fn test_explicit_rollback() {
        let db = test_db().await;

        let mut tx = ScopedTx::begin(db.pool(), "test.rollback").await.unwrap();
        insert_engine(&mut tx, "e-1").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(engine_count(db.pool()).await, 0);
    }

    #[tokio::test]
    async fn test_error_path_rolls_back_earlier_statements() {
        let db = test_db().await;

        let result: DbResult<()> = async {
            let mut tx = ScopedTx::begin(db.pool(), "test.error").await?;
            insert_engine(&mut tx, "e-1").await?;
            // Same primary key again: fails, the first insert must not survive.
            insert_engine(&mut tx, "e-1").await?;
            tx.commit().await
        }
        .await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert_eq!(engine_count(db.pool()).await, 0);
    }

    #[tokio::test]
    async fn test_deadline_mid_transaction_rolls_back() {
        let db = test_db().await;
        let pool = db.pool().clone();
        let ctx = OpContext::new().with_timeout(Duration::from_millis(50));

        let result: DbResult<()> = ctx
            .run("test.stall", async {
                let mut tx = ScopedTx::begin(&pool, "test.stall").await?;
                insert_engine(&mut tx, "e-1").await?;
                std::future::pending::<()>().await;
                tx.commit().await
            })
            .await;

        assert!(matches!(result, Err(DbError::DeadlineExceeded { .. })));
        assert_eq!(engine_count(db.pool()).await, 0);
    }

    #[tokio::test]
    async fn test_writer_behind_held_lock_reports_busy() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("busy.db"))
            .max_connections(2)
            .busy_timeout(Duration::from_millis(100));
        let db = Database::new(config).await.unwrap();

        let holder = ScopedTx::begin_write(db.pool(), "test.holder").await.unwrap();
        let waiter = ScopedTx::begin_write(db.pool(), "test.waiter").await;
        assert!(matches!(waiter, Err(DbError::Busy(_))));

        holder.commit().await.unwrap();
        let next = ScopedTx::begin_write(db.pool(), "test.next").await;
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn test_panic_mid_transaction_rolls_back() {
        let db = test_db().await;
        let pool = db.pool().clone();

        let handle = tokio::spawn(async move {
            let mut tx = ScopedTx::begin(&pool, "test.panic").await.unwrap();
            insert_engine(&mut tx, "e-1").await.unwrap();
            panic!("statement execution blew up");
        });

        assert!(handle.await.is_err());
        assert_eq!(engine_count(db.pool()).await, 0);
    }
}
