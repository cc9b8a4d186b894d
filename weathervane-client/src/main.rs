// weathervane-client/src/main.rs
//
// Small CLI for poking a running weathervane server: fetch current
// conditions or a forecast, request predictions, or score a custom
// feature payload. Prints the JSON the server returns.
use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::Value;

use weathervane_common::FeatureKind;

type BoxedError = Box<dyn Error + Send + Sync>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the weathervane server
    #[arg(short, long, default_value = "http://localhost:3001")]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current conditions for a city
    Current {
        #[arg(short, long)]
        city: Option<String>,
    },
    /// 3-day forecast for a city
    Forecast {
        #[arg(short, long)]
        city: Option<String>,
    },
    /// Predict one measurement from stored history
    Predict {
        /// One of: temperature, humidity, wind, pressure, precipitation
        #[arg(short, long)]
        target: String,
    },
    /// Predict every measurement the loaded model declares
    PredictAll,
    /// Score a JSON file of named feature values with the tabular model
    Score {
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), BoxedError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let base_url = cli.base_url.trim_end_matches('/').to_string();
    let client = Client::new();

    let response = match cli.command {
        Commands::Current { city } => {
            let mut request = client.get(format!("{}/weather", base_url));
            if let Some(city) = city {
                request = request.query(&[("city", city)]);
            }
            request.send().await?
        }
        Commands::Forecast { city } => {
            let mut request = client.get(format!("{}/forecast", base_url));
            if let Some(city) = city {
                request = request.query(&[("city", city)]);
            }
            request.send().await?
        }
        Commands::Predict { target } => {
            // Validate locally so a typo fails before the network does.
            let kind: FeatureKind = target.parse().map_err(|e| format!("{}", e))?;
            client
                .get(format!("{}/api/predict", base_url))
                .query(&[("type", kind.as_str())])
                .send()
                .await?
        }
        Commands::PredictAll => {
            client.get(format!("{}/api/predict/all", base_url)).send().await?
        }
        Commands::Score { file } => {
            let payload = std::fs::read_to_string(&file)?;
            let body: Value = serde_json::from_str(&payload)?;
            client
                .post(format!("{}/predict", base_url))
                .json(&body)
                .send()
                .await?
        }
    };

    let status = response.status();
    let body: Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);

    if !status.is_success() {
        return Err(format!("server responded with {}", status).into());
    }
    Ok(())
}
