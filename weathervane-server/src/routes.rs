// weathervane-server/src/routes.rs
//
// Serving endpoints. Every request walks the same path: validate, consult
// the cache, compute on a miss, cache the result, respond. All failures
// funnel through ApiError into a JSON body with an HTTP status.
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use weathervane_common::{latest_window, FeatureKind, PredictionResult, ServiceError};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GET / — liveness probe with a little uptime detail.
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "weathervane is running",
        "uptime_secs": state.startup_time.elapsed().as_secs(),
        "requests": state.request_count.load(Ordering::SeqCst),
    }))
}

/// GET /weather?city= — current conditions, cached per city, budgeted
/// against the monthly upstream call limit.
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> ApiResult<Json<Value>> {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    let city = query
        .city
        .unwrap_or_else(|| state.config.default_city.clone())
        .to_lowercase();

    let cache_key = format!("current_{}", city);
    if let Some(hit) = state.cache.get(&cache_key, state.config.cache_ttl) {
        info!("Cache hit for {}", cache_key);
        return Ok(Json(hit));
    }

    let calls_this_month = state.budget.try_consume()?;
    let data = state.weather_api.current(&city).await?;

    let body = json!({
        "city": data.location.name,
        "region": data.location.region,
        "country": data.location.country,
        "coordinates": {
            "latitude": data.location.lat,
            "longitude": data.location.lon,
        },
        "timestamp": data.location.localtime,
        "measurements": {
            "temperature_c": data.current.temp_c,
            "humidity_percent": data.current.humidity,
            "wind_speed_kmh": data.current.wind_kph,
            "pressure_hpa": data.current.pressure_mb,
            "precipitation_mm": data.current.precip_mm,
        },
        "conditions": {
            "text": data.current.condition.text,
            "icon": data.current.condition.icon,
        },
        "metadata": {
            "api_calls_this_month": calls_this_month,
            "monthly_limit": state.budget.limit(),
        },
    });

    if state.config.persist_observations {
        let row = data.to_feature_row();
        if let Err(e) = state.store.insert(&city, &row).await {
            // An unsaved observation should not fail the weather response.
            warn!("Could not persist observation for {}: {}", city, e);
        }
    }

    state.cache.put(cache_key, body.clone());
    Ok(Json(body))
}

/// GET /forecast?city= — 3-day forecast, cached per city.
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> ApiResult<Json<Value>> {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    let city = query
        .city
        .unwrap_or_else(|| state.config.default_city.clone())
        .to_lowercase();

    let cache_key = format!("forecast_{}", city);
    if let Some(hit) = state.cache.get(&cache_key, state.config.cache_ttl) {
        info!("Cache hit for {}", cache_key);
        return Ok(Json(hit));
    }

    let data = state.weather_api.forecast(&city, 3).await?;
    let body = json!({
        "location": data.location.name,
        "forecast": data
            .forecast
            .forecastday
            .iter()
            .map(|day| {
                json!({
                    "date": day.date,
                    "day": {
                        "maxtemp_c": day.day.maxtemp_c,
                        "mintemp_c": day.day.mintemp_c,
                        "avgtemp_c": day.day.avgtemp_c,
                        "condition": day.day.condition.text,
                        "maxwind_kph": day.day.maxwind_kph,
                        "totalprecip_mm": day.day.totalprecip_mm,
                    },
                })
            })
            .collect::<Vec<_>>(),
    });

    state.cache.put(cache_key, body.clone());
    Ok(Json(body))
}

/// GET /api/predict?type= — one predicted measurement from the latest
/// history window.
pub async fn predict_one(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> ApiResult<Json<Value>> {
    state.request_count.fetch_add(1, Ordering::SeqCst);
    let requested = query.kind.ok_or_else(|| {
        ApiError::from(ServiceError::InvalidParameter(
            "missing required parameter 'type'".into(),
        ))
        .with_detail(json!({ "valid_types": FeatureKind::valid_types() }))
    })?;

    let kind: FeatureKind = requested.parse().map_err(|e: ServiceError| {
        ApiError::from(e).with_detail(json!({
            "requested": requested,
            "valid_types": FeatureKind::valid_types(),
        }))
    })?;

    let cache_key = format!("predict_{}", kind);
    if let Some(hit) = state.cache.get(&cache_key, state.config.cache_ttl) {
        info!("Cache hit for {}", cache_key);
        return Ok(Json(hit));
    }

    let result = run_sequence_prediction(&state).await?;
    let value = result.get(kind).ok_or_else(|| {
        ServiceError::InvalidParameter(format!(
            "model '{}' does not predict {}",
            result.model, kind
        ))
    })?;

    let mut body = serde_json::Map::new();
    body.insert(kind.response_key(), json!(value));
    body.insert("model".into(), json!(result.model));
    body.insert("generated_at".into(), json!(result.generated_at));
    let body = Value::Object(body);
    state.cache.put(cache_key, body.clone());
    Ok(Json(body))
}

/// GET /api/predict/all — every measurement the loaded model declares.
pub async fn predict_all(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    state.request_count.fetch_add(1, Ordering::SeqCst);

    let cache_key = "predict_all";
    if let Some(hit) = state.cache.get(cache_key, state.config.cache_ttl) {
        info!("Cache hit for {}", cache_key);
        return Ok(Json(hit));
    }

    let result = run_sequence_prediction(&state).await?;
    let body = serde_json::to_value(&result)
        .map_err(|e| ServiceError::Unexpected(format!("cannot serialize prediction: {}", e)))?;
    state.cache.put(cache_key, body.clone());
    Ok(Json(body))
}

/// POST /predict — score caller-supplied named feature values with the
/// tabular backend against its explicit schema.
pub async fn predict_custom(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    state.request_count.fetch_add(1, Ordering::SeqCst);

    let values = body.as_object().ok_or_else(|| {
        ServiceError::InvalidParameter("request body must be a JSON object".into())
    })?;

    let result = state.tabular_model.predict(values)?;
    let response = serde_json::to_value(&result)
        .map_err(|e| ServiceError::Unexpected(format!("cannot serialize prediction: {}", e)))?;
    Ok(Json(response))
}

/// Fetch the latest history, take the final window of the model's
/// sequence length, and score it. A short history is the caller-visible
/// `InsufficientData` case.
async fn run_sequence_prediction(state: &AppState) -> Result<PredictionResult, ServiceError> {
    let rows = state.store.latest(state.config.history_limit).await?;
    let required = state.sequence_model.sequence_length();
    let window = latest_window(&rows, required).ok_or(ServiceError::InsufficientData {
        available: rows.len(),
        required,
    })?;
    state.sequence_model.predict(&window)
}
