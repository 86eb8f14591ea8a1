//! # HTTP Routes
//!
//! Router construction and request handlers.
//!
//! | Method | Path               | Auth   | Success                     |
//! |--------|--------------------|--------|-----------------------------|
//! | POST   | /login             | none   | `{token}`                   |
//! | GET    | /car/{id}          | bearer | Car, or `{}` when absent    |
//! | GET    | /cars/{brand}      | bearer | `[Car]` (`?isEngine=true`)  |
//! | POST   | /cars              | bearer | Car, 201                    |
//! | PUT    | /cars/{id}         | bearer | Car                         |
//! | DELETE | /cars/{id}         | bearer | deleted Car                 |
//! | GET    | /engine/{id}       | bearer | Engine                      |
//! | POST   | /engine            | bearer | Engine, 201                 |
//! | PUT    | /engine/{id}       | bearer | Engine                      |
//! | DELETE | /engine/{id}       | bearer | deleted Engine              |
//! | GET    | /metrics           | none   | Prometheus text             |
//!
//! `/cars/{brand}` and `/cars/{id}` share one route template, registered
//! as `/cars/{id}`; the GET handler reads the segment as a brand.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use carzone_core::{Car, CarRequest, Credentials, Engine, EngineRequest};

use crate::auth::AuthenticatedSubject;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{require_bearer, track_metrics};
use crate::AppState;

// =============================================================================
// Router
// =============================================================================

/// Builds the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/car/{id}", get(get_car))
        .route("/cars", post(create_car))
        .route(
            "/cars/{id}",
            get(list_cars_by_brand).put(update_car).delete(delete_car),
        )
        .route("/engine", post(create_engine))
        .route(
            "/engine/{id}",
            get(get_engine).put(update_engine).delete(delete_engine),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/login", post(login))
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        // Added after the metrics layer so scrapes are not metered
        .route("/metrics", get(scrape_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(rejection.body_text())
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(credentials) = payload.map_err(bad_body)?;

    if let Err(e) = state.operator.check(&credentials) {
        warn!(username = %credentials.username, "Rejected login attempt");
        return Err(e);
    }

    let token = state.auth.issue(&credentials.username)?;
    info!(username = %credentials.username, "Operator logged in");

    Ok(Json(TokenResponse { token }))
}

// =============================================================================
// Cars
// =============================================================================

#[derive(Debug, Deserialize)]
struct BrandQuery {
    #[serde(rename = "isEngine")]
    is_engine: Option<String>,
}

async fn get_car(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Response> {
    let car = state.cars.get_by_id(&state.op_context(), &id).await?;

    Ok(match car {
        Some(car) => Json(car).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    })
}

async fn list_cars_by_brand(
    State(state): State<Arc<AppState>>,
    Path(brand): Path<String>,
    Query(query): Query<BrandQuery>,
) -> ApiResult<Json<Vec<Car>>> {
    let include_engine = query.is_engine.as_deref() == Some("true");
    let cars = state
        .cars
        .get_by_brand(&state.op_context(), &brand, include_engine)
        .await?;
    Ok(Json(cars))
}

async fn create_car(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<AuthenticatedSubject>,
    payload: Result<Json<CarRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Car>)> {
    let Json(request) = payload.map_err(bad_body)?;
    let car = state.cars.create(&state.op_context(), &request).await?;

    info!(subject = %subject.0, car_id = %car.id, "Car created");
    Ok((StatusCode::CREATED, Json(car)))
}

async fn update_car(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<AuthenticatedSubject>,
    Path(id): Path<String>,
    payload: Result<Json<CarRequest>, JsonRejection>,
) -> ApiResult<Json<Car>> {
    let Json(request) = payload.map_err(bad_body)?;
    let car = state.cars.update(&state.op_context(), &id, &request).await?;

    info!(subject = %subject.0, car_id = %car.id, "Car updated");
    Ok(Json(car))
}

async fn delete_car(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<AuthenticatedSubject>,
    Path(id): Path<String>,
) -> ApiResult<Json<Car>> {
    let car = state.cars.delete(&state.op_context(), &id).await?;

    info!(subject = %subject.0, car_id = %car.id, "Car deleted");
    Ok(Json(car))
}

// =============================================================================
// Engines
// =============================================================================

async fn get_engine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Engine>> {
    let engine = state.engines.get_by_id(&state.op_context(), &id).await?;
    Ok(Json(engine))
}

async fn create_engine(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<AuthenticatedSubject>,
    payload: Result<Json<EngineRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Engine>)> {
    let Json(request) = payload.map_err(bad_body)?;
    let engine = state.engines.create(&state.op_context(), &request).await?;

    info!(subject = %subject.0, engine_id = %engine.engine_id, "Engine created");
    Ok((StatusCode::CREATED, Json(engine)))
}

async fn update_engine(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<AuthenticatedSubject>,
    Path(id): Path<String>,
    payload: Result<Json<EngineRequest>, JsonRejection>,
) -> ApiResult<Json<Engine>> {
    let Json(request) = payload.map_err(bad_body)?;
    let engine = state
        .engines
        .update(&state.op_context(), &id, &request)
        .await?;

    info!(subject = %subject.0, engine_id = %engine.engine_id, "Engine updated");
    Ok(Json(engine))
}

async fn delete_engine(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<AuthenticatedSubject>,
    Path(id): Path<String>,
) -> ApiResult<Json<Engine>> {
    let engine = state.engines.delete(&state.op_context(), &id).await?;

    info!(subject = %subject.0, engine_id = %engine.engine_id, "Engine deleted");
    Ok(Json(engine))
}

// =============================================================================
// Metrics
// =============================================================================

async fn scrape_metrics(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(format!("Failed to render metrics: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use carzone_db::{Database, DbConfig};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::config::ApiConfig;
    use crate::middleware::UNMATCHED_PATH;

    async fn test_state() -> Arc<AppState> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        Arc::new(AppState::new(config, db).unwrap())
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/login",
            None,
            Some(json!({ "username": "admin", "password": "admin123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_engine(app: &Router, token: &str) -> Value {
        let (status, engine) = send(
            app,
            "POST",
            "/engine",
            Some(token),
            Some(json!({ "displacement": 1998, "no_of_cylinders": 4, "car_range": 650 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        engine
    }

    fn car_body(engine_id: &str) -> Value {
        json!({
            "name": "Golf",
            "year": "2021",
            "brand": "Volkswagen",
            "fuel_type": "Petrol",
            "engine": { "engine_id": engine_id },
            "price": 25000.0
        })
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let app = build_router(test_state().await);
        let (status, _) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({ "username": "admin", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let state = test_state().await;
        let app = build_router(state.clone());
        let path = format!("/car/{}", Uuid::new_v4());

        let (status, _) = send(&app, "GET", &path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", &path, Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Rejections are still metered, under the route template.
        assert_eq!(state.metrics.request_count("/car/{id}", "GET"), 2);
        assert_eq!(state.metrics.status_count("/car/{id}", "GET", 401), 2);
    }

    #[tokio::test]
    async fn test_car_lifecycle() {
        let app = build_router(test_state().await);
        let token = login(&app).await;
        let engine = create_engine(&app, &token).await;
        let engine_id = engine["engine_id"].as_str().unwrap();

        let (status, car) = send(&app, "POST", "/cars", Some(&token), Some(car_body(engine_id))).await;
        assert_eq!(status, StatusCode::CREATED);
        let car_id = car["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&app, "GET", &format!("/car/{car_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], "Golf");
        assert_eq!(fetched["engine"]["car_range"], 650);

        let (_, with_engine) =
            send(&app, "GET", "/cars/Volkswagen?isEngine=true", Some(&token), None).await;
        assert_eq!(with_engine.as_array().unwrap().len(), 1);
        assert!(with_engine[0].get("engine").is_some());

        let (_, without_engine) = send(&app, "GET", "/cars/Volkswagen", Some(&token), None).await;
        assert!(without_engine[0].get("engine").is_none());

        let mut change = car_body(engine_id);
        change["price"] = json!(23500.0);
        let (status, updated) =
            send(&app, "PUT", &format!("/cars/{car_id}"), Some(&token), Some(change)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["price"], 23500.0);

        let (status, deleted) =
            send(&app, "DELETE", &format!("/cars/{car_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["id"], car_id.as_str());

        let (status, gone) = send(&app, "GET", &format!("/car/{car_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gone, json!({}));
    }

    #[tokio::test]
    async fn test_create_car_with_missing_engine_is_unprocessable() {
        let app = build_router(test_state().await);
        let token = login(&app).await;

        let body = car_body(&Uuid::new_v4().to_string());
        let (status, error) = send(&app, "POST", "/cars", Some(&token), Some(body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(error["error"].as_str().unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_invalid_car_is_bad_request() {
        let app = build_router(test_state().await);
        let token = login(&app).await;
        let engine = create_engine(&app, &token).await;

        let mut body = car_body(engine["engine_id"].as_str().unwrap());
        body["fuel_type"] = json!("petrol");
        let (status, _) = send(&app, "POST", "/cars", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/cars", Some(&token), Some(json!({ "name": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_engine_not_found_and_conflict() {
        let app = build_router(test_state().await);
        let token = login(&app).await;

        let missing = format!("/engine/{}", Uuid::new_v4());
        let (status, _) = send(&app, "GET", &missing, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "PUT", &missing, Some(&token),
            Some(json!({ "displacement": 1, "no_of_cylinders": 1, "car_range": 1 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let engine = create_engine(&app, &token).await;
        let engine_id = engine["engine_id"].as_str().unwrap();
        let (status, _) = send(&app, "POST", "/cars", Some(&token), Some(car_body(engine_id))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) =
            send(&app, "DELETE", &format!("/engine/{engine_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_is_public() {
        let app = build_router(test_state().await);
        let token = login(&app).await;
        create_engine(&app, &token).await;

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("path=\"/engine\""));
        assert!(!text.contains("path=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unmatched_paths_share_one_series() {
        let state = test_state().await;
        let app = build_router(state.clone());

        for uri in ["/wp-admin", "/nope/1", "/nope/2"] {
            let (status, _) = send(&app, "GET", uri, None, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        assert_eq!(state.metrics.request_count("/wp-admin", "GET"), 0);
        assert_eq!(state.metrics.request_count(UNMATCHED_PATH, "GET"), 3);

        let text = state.metrics.render().unwrap();
        assert!(!text.contains("/nope/"));
    }
}
