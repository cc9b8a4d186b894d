// weathervane-server/src/state.rs
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use weathervane_common::{SequenceModel, TabularModel, TtlCache};

use crate::budget::CallBudget;
use crate::config::Config;
use crate::store::FeatureStore;
use crate::upstream::WeatherApi;

/// Shared application state. One instance for the process, behind an Arc.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn FeatureStore>,
    pub weather_api: WeatherApi,
    pub sequence_model: SequenceModel,
    pub tabular_model: TabularModel,
    pub cache: TtlCache<Value>,
    pub budget: CallBudget,
    pub request_count: AtomicUsize,
    pub startup_time: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn FeatureStore>,
        weather_api: WeatherApi,
        sequence_model: SequenceModel,
        tabular_model: TabularModel,
    ) -> Self {
        let budget = CallBudget::new(config.counter_file.clone(), config.monthly_call_limit);
        AppState {
            config,
            store,
            weather_api,
            sequence_model,
            tabular_model,
            cache: TtlCache::new(),
            budget,
            request_count: AtomicUsize::new(0),
            startup_time: Instant::now(),
        }
    }
}
