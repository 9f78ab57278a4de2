// src/main.rs
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use truckload::api::{self, ApiState};
use truckload::config::AppConfig;
use truckload::fleet::FleetRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("truckload=info,tower_http=info")),
        )
        .with(fmt::layer())
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let registry = FleetRegistry::load(app_config.fleet.file());
    info!(
        "🚚 Packing service starting with {} trucks in the fleet",
        registry.trucks().len()
    );

    let state = ApiState::new(registry, app_config.limits);
    api::start_api_server(app_config.api, state).await
}
