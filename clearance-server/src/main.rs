use std::net::SocketAddr;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use clearance_server::aggregate::{CrossingClient, CrossingConfig, JoinStrategy};
use clearance_server::arcgis::{DEFAULT_SERVICE_ROOT, FeatureServiceClient, ServiceConfig};
use clearance_server::web::{AppState, create_router};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let service_root =
        std::env::var("CROSSING_SERVICE_URL").unwrap_or_else(|_| DEFAULT_SERVICE_ROOT.to_string());

    let strategy = match std::env::var("CROSSING_STRATEGY") {
        Ok(s) => s.parse::<JoinStrategy>()?,
        Err(_) => JoinStrategy::default(),
    };

    let feature_service = FeatureServiceClient::new(ServiceConfig::parse(&service_root)?)?;
    let mut crossings = CrossingClient::new(
        feature_service,
        CrossingConfig::default().with_strategy(strategy),
    );

    // Discovery is best-effort; the defaults match the published service
    if std::env::var_os("CROSSING_DISCOVER").is_some() {
        match crossings.clone().discover().await {
            Ok(discovered) => crossings = discovered,
            Err(e) => warn!(error = %e, "schema discovery failed, using default IDs"),
        }
    }

    let app = create_router(AppState::new(crossings));

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;
    info!(%addr, %service_root, %strategy, "clearance server listening");
    info!("  GET  /health         - Health check");
    info!("  GET  /crossing/:id   - Assembled crossing with per-lane clearances");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
