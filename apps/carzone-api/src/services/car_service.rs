//! Car service.

use tracing::debug;

use carzone_core::validation::{parse_id, validate_car_request};
use carzone_core::{Car, CarRequest};
use carzone_db::{Database, OpContext};

use crate::error::{ApiError, ApiResult};

/// Validating front for [`carzone_db::CarRepository`].
#[derive(Debug, Clone)]
pub struct CarService {
    db: Database,
}

impl CarService {
    pub fn new(db: Database) -> Self {
        CarService { db }
    }

    /// `Ok(None)` when no car has this id.
    pub async fn get_by_id(&self, ctx: &OpContext, id: &str) -> ApiResult<Option<Car>> {
        let id = parse_id(id)?;
        Ok(self.db.cars().get_by_id(ctx, id).await?)
    }

    pub async fn get_by_brand(
        &self,
        ctx: &OpContext,
        brand: &str,
        include_engine: bool,
    ) -> ApiResult<Vec<Car>> {
        if brand.trim().is_empty() {
            return Err(ApiError::Validation("brand is required".to_string()));
        }
        Ok(self.db.cars().get_by_brand(ctx, brand, include_engine).await?)
    }

    pub async fn create(&self, ctx: &OpContext, request: &CarRequest) -> ApiResult<Car> {
        validate_car_request(request)?;
        Ok(self.db.cars().create(ctx, request).await?)
    }

    pub async fn update(&self, ctx: &OpContext, id: &str, request: &CarRequest) -> ApiResult<Car> {
        let id = parse_id(id)?;
        validate_car_request(request)?;
        if !request.engine.engine_id.is_nil() {
            debug!(car_id = %id, "Ignoring engine in car update; the reference is fixed at creation");
        }
        Ok(self.db.cars().update(ctx, id, request).await?)
    }

    pub async fn delete(&self, ctx: &OpContext, id: &str) -> ApiResult<Car> {
        let id = parse_id(id)?;
        Ok(self.db.cars().delete(ctx, id).await?)
    }
}
