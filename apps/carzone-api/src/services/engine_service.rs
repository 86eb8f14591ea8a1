//! Engine service.

use carzone_core::validation::{parse_id, validate_engine_request};
use carzone_core::{Engine, EngineRequest};
use carzone_db::{Database, OpContext};

use crate::error::ApiResult;

/// Validating front for [`carzone_db::EngineRepository`].
#[derive(Debug, Clone)]
pub struct EngineService {
    db: Database,
}

impl EngineService {
    pub fn new(db: Database) -> Self {
        EngineService { db }
    }

    pub async fn get_by_id(&self, ctx: &OpContext, id: &str) -> ApiResult<Engine> {
        let id = parse_id(id)?;
        Ok(self.db.engines().get_by_id(ctx, id).await?)
    }

    pub async fn create(&self, ctx: &OpContext, request: &EngineRequest) -> ApiResult<Engine> {
        validate_engine_request(request)?;
        Ok(self.db.engines().create(ctx, request).await?)
    }

    pub async fn update(
        &self,
        ctx: &OpContext,
        id: &str,
        request: &EngineRequest,
    ) -> ApiResult<Engine> {
        let id = parse_id(id)?;
        validate_engine_request(request)?;
        Ok(self.db.engines().update(ctx, id, request).await?)
    }

    pub async fn delete(&self, ctx: &OpContext, id: &str) -> ApiResult<Engine> {
        let id = parse_id(id)?;
        Ok(self.db.engines().delete(ctx, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use carzone_db::DbConfig;

    use super::*;
    use crate::error::ApiError;

    async fn closed_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        db
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_store() {
        // A closed pool turns any store access into an internal error.
        let service = EngineService::new(closed_db().await);
        let request = EngineRequest {
            displacement: 0,
            no_of_cylinders: 4,
            car_range: 500,
        };

        let result = service.create(&OpContext::new(), &request).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bad_id_is_validation_error() {
        let service = EngineService::new(closed_db().await);
        let result = service.get_by_id(&OpContext::new(), "not-a-uuid").await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_valid_request_reaches_store() {
        let service = EngineService::new(closed_db().await);
        let request = EngineRequest {
            displacement: 1600,
            no_of_cylinders: 4,
            car_range: 500,
        };

        let result = service.create(&OpContext::new(), &request).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }
}
