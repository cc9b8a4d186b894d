// weathervane-server/src/main.rs
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use weathervane_common::{SequenceModel, TabularModel};
use weathervane_server::store::PgFeatureStore;
use weathervane_server::upstream::WeatherApi;
use weathervane_server::{app, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    // Model artifacts are read-only from here on; a broken bundle should
    // stop the process before it can serve a bad prediction.
    let sequence_model = SequenceModel::load(&config.sequence_bundle)?;
    info!(
        "Loaded sequence model '{}' (window length {})",
        sequence_model.id(),
        sequence_model.sequence_length()
    );
    let tabular_model = TabularModel::load(&config.tabular_bundle)?;
    info!("Loaded tabular model '{}'", tabular_model.id());

    let store = Arc::new(PgFeatureStore::connect(&config.database_url).await?);
    let weather_api = WeatherApi::new(&config.weather_api_base, &config.weather_api_key)?;

    let port = config.port;
    let state = Arc::new(AppState::new(
        config,
        store,
        weather_api,
        sequence_model,
        tabular_model,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting weathervane server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down successfully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received...");
}
