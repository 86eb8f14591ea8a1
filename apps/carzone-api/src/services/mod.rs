//! Service layer.
//!
//! Services sit between the HTTP handlers and the repositories. They parse
//! path ids, run validation, and only then touch the store. Input that
//! fails validation never opens a transaction.

pub mod car_service;
pub mod engine_service;

pub use car_service::CarService;
pub use engine_service::EngineService;
