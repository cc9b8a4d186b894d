// weathervane-server/tests/api.rs
//
// Endpoint tests against the real router with an in-memory feature store
// and synthetic model bundles; no database, no network.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use weathervane_common::{
    FeatureKind, FeatureRow, ModelMetadata, SequenceBundle, SequenceModel, ServiceError,
    TabularBundle, TabularField, TabularModel, TabularSchema,
};
use weathervane_server::store::FeatureStore;
use weathervane_server::upstream::WeatherApi;
use weathervane_server::{app, AppState, Config};

struct MemoryStore {
    rows: Vec<FeatureRow>,
    queries: AtomicUsize,
}

impl MemoryStore {
    fn new(rows: Vec<FeatureRow>) -> Self {
        MemoryStore {
            rows,
            queries: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FeatureStore for MemoryStore {
    async fn latest(&self, limit: i64) -> Result<Vec<FeatureRow>, ServiceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let take = (limit as usize).min(self.rows.len());
        Ok(self.rows[self.rows.len() - take..].to_vec())
    }

    async fn insert(&self, _city: &str, _row: &FeatureRow) -> Result<(), ServiceError> {
        Ok(())
    }
}

fn history(n: usize) -> Vec<FeatureRow> {
    let start = Utc::now();
    (0..n)
        .map(|i| FeatureRow {
            recorded_at: start + chrono::Duration::hours(i as i64),
            temperature_c: 12.0 + 1.5 * i as f64,
            humidity_percent: 40.0 + i as f64,
            wind_speed_kmh: 5.0 + 0.5 * i as f64,
            pressure_hpa: 1000.0 + i as f64,
            precipitation_mm: 0.2 * i as f64,
        })
        .collect()
}

/// A bundle whose output for each feature is the mean of that feature's
/// normalized values over the window.
fn mean_bundle(rows: &[FeatureRow], len: usize) -> SequenceBundle {
    let features = FeatureKind::ALL.len();
    let normalization = weathervane_common::NormalizationParameters::fit(rows).unwrap();
    let mut weights = Vec::new();
    for k in 0..features {
        let mut row = vec![0.0; len * features];
        for step in 0..len {
            row[step * features + k] = 1.0 / len as f64;
        }
        weights.push(row);
    }
    SequenceBundle {
        metadata: ModelMetadata {
            id: "seq-test".into(),
            created_at: Utc::now(),
        },
        sequence_length: len,
        normalization,
        outputs: FeatureKind::ALL.to_vec(),
        weights,
        bias: vec![0.0; features],
    }
}

fn tabular_bundle() -> TabularBundle {
    TabularBundle {
        metadata: ModelMetadata {
            id: "tab-test".into(),
            created_at: Utc::now(),
        },
        target: FeatureKind::Temperature,
        schema: TabularSchema {
            fields: vec![
                TabularField::Numeric {
                    name: "humidity_percent".into(),
                },
                TabularField::Categorical {
                    name: "weather_condition".into(),
                    domain: vec!["Sunny".into(), "Cloudy".into()],
                },
            ],
        },
        weights: vec![0.1, 4.0, -2.0],
        bias: 10.0,
    }
}

struct TestService {
    state: Arc<AppState>,
    store: Arc<MemoryStore>,
    // Keeps the counter file alive for the test's duration.
    _tempdir: tempfile::TempDir,
}

fn service(rows: Vec<FeatureRow>, monthly_call_limit: u32) -> TestService {
    let tempdir = tempfile::tempdir().unwrap();
    let reference = history(10);
    let config = Config {
        port: 0,
        weather_api_key: "test-key".into(),
        weather_api_base: "http://127.0.0.1:1/v1".into(),
        default_city: "Nairobi".into(),
        database_url: String::new(),
        sequence_bundle: "unused".into(),
        tabular_bundle: "unused".into(),
        cache_ttl: Duration::from_secs(1800),
        history_limit: 30,
        counter_file: tempdir.path().join("counter.json"),
        monthly_call_limit,
        persist_observations: false,
    };
    let sequence_model = SequenceModel::from_bundle(mean_bundle(&reference, 10)).unwrap();
    let tabular_model = TabularModel::from_bundle(tabular_bundle()).unwrap();
    let weather_api = WeatherApi::new(&config.weather_api_base, &config.weather_api_key).unwrap();
    let store = Arc::new(MemoryStore::new(rows));
    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        weather_api,
        sequence_model,
        tabular_model,
    ));
    TestService {
        state,
        store,
        _tempdir: tempdir,
    }
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(state: Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn root_reports_liveness() {
    let svc = service(history(10), 10);
    let (status, body) = get(svc.state.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "weathervane is running");
}

#[tokio::test]
async fn unknown_prediction_type_is_rejected_with_valid_types() {
    let svc = service(history(10), 10);
    let (status, body) = get(svc.state.clone(), "/api/predict?type=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["requested"], "bogus");
    assert_eq!(
        body["valid_types"],
        json!(["temperature", "humidity", "wind", "pressure", "precipitation"])
    );
}

#[tokio::test]
async fn missing_prediction_type_is_rejected() {
    let svc = service(history(10), 10);
    let (status, body) = get(svc.state.clone(), "/api/predict").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("type"));
}

#[tokio::test]
async fn short_history_reports_insufficient_data() {
    let svc = service(history(9), 10);
    let (status, body) = get(svc.state.clone(), "/api/predict?type=temperature").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["available"], 9);
    assert_eq!(body["required"], 10);
}

#[tokio::test]
async fn predict_returns_the_window_mean_for_the_mean_model() {
    let rows = history(10);
    let expected: f64 = rows.iter().map(|r| r.temperature_c).sum::<f64>() / rows.len() as f64;
    let svc = service(rows, 10);

    let (status, body) = get(svc.state.clone(), "/api/predict?type=temperature").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "seq-test");
    let predicted = body["predicted_temperature_c"].as_f64().unwrap();
    assert!((predicted - expected).abs() < 1e-6, "{} != {}", predicted, expected);
}

#[tokio::test]
async fn repeated_predictions_within_ttl_hit_the_cache() {
    let svc = service(history(10), 10);

    let (_, first) = get(svc.state.clone(), "/api/predict?type=humidity").await;
    let (_, second) = get(svc.state.clone(), "/api/predict?type=humidity").await;
    assert_eq!(first, second);
    assert_eq!(svc.store.queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn predict_all_covers_every_declared_output() {
    let svc = service(history(10), 10);
    let (status, body) = get(svc.state.clone(), "/api/predict/all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "seq-test");
    for kind in FeatureKind::ALL {
        assert!(
            body[kind.response_key()].is_f64(),
            "missing {}",
            kind.response_key()
        );
    }
}

#[tokio::test]
async fn custom_prediction_scores_against_the_schema() {
    let svc = service(history(10), 10);
    let (status, body) = post_json(
        svc.state.clone(),
        "/predict",
        json!({"humidity_percent": 50.0, "weather_condition": "Sunny"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "tab-test");
    let predicted = body["predicted_temperature_c"].as_f64().unwrap();
    assert!((predicted - 19.0).abs() < 1e-9);
}

#[tokio::test]
async fn custom_prediction_rejects_unknown_category() {
    let svc = service(history(10), 10);
    let (status, body) = post_json(
        svc.state.clone(),
        "/predict",
        json!({"humidity_percent": 50.0, "weather_condition": "Hail"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Hail"));
}

#[tokio::test]
async fn spent_budget_rejects_weather_requests_before_the_upstream_call() {
    // Limit 0: the budget check fires first, so the unreachable upstream
    // base URL is never contacted.
    let svc = service(history(10), 0);
    let (status, body) = get(svc.state.clone(), "/weather?city=Nairobi").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Monthly request limit reached");
    assert_eq!(body["limit"], 0);
}
