//! # Carzone API
//!
//! HTTP server for the car and engine inventory.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Carzone API                                     │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Login         │  │  Cars          │  │  Engines                   ││
//! │  │                │  │                │  │                            ││
//! │  │ • POST /login  │  │ • GET /car/{id}│  │ • GET    /engine/{id}      ││
//! │  │                │  │ • GET /cars/{b}│  │ • POST   /engine           ││
//! │  │                │  │ • POST /cars   │  │ • PUT    /engine/{id}      ││
//! │  │                │  │ • PUT/DELETE   │  │ • DELETE /engine/{id}      ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │  SQLite      │  │  Prometheus  │  │    JWT Auth              ││  │
//! │  │  │  (carzone-db)│  │  /metrics    │  │    HS256 bearer tokens   ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - HTTP server port (default: 8080)
//! - `DATABASE_PATH` - SQLite database file (default: carzone.db)
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `APPLY_SCHEMA` - Create tables at startup (default: true)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `TOKEN_LIFETIME_SECS` - Token lifetime (default: 86400)
//! - `OPERATOR_USERNAME` / `OPERATOR_PASSWORD` - Login (default: admin / admin123)
//! - `REQUEST_TIMEOUT_SECS` - Deadline for store calls (default: 30)

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;

use carzone_db::{Database, OpContext};

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;

use crate::auth::{OperatorIdentity, TokenAuthenticator};
use crate::metrics::RequestMetricsRecorder;
use crate::services::{CarService, EngineService};

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub cars: CarService,
    pub engines: EngineService,
    pub auth: TokenAuthenticator,
    pub operator: OperatorIdentity,
    pub metrics: RequestMetricsRecorder,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires services, authentication and metrics around `db`.
    pub fn new(config: ApiConfig, db: Database) -> Result<Self, prometheus::Error> {
        Ok(AppState {
            cars: CarService::new(db.clone()),
            engines: EngineService::new(db.clone()),
            auth: TokenAuthenticator::new(&config.jwt_secret, config.token_lifetime_secs),
            operator: OperatorIdentity::new(
                config.operator_username.clone(),
                config.operator_password.clone(),
            ),
            metrics: RequestMetricsRecorder::new()?,
            db,
            config,
        })
    }

    /// Context for the store calls of one request.
    pub fn op_context(&self) -> OpContext {
        OpContext::new().with_timeout(self.config.request_timeout)
    }
}
