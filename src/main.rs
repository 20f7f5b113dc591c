use ecopack::api;
use ecopack::config::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env before the subscriber so RUST_LOG from the file applies.
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let AppConfig {
        api: api_config,
        engine,
    } = AppConfig::from_env();

    info!("🚀 Packing service starting...");
    if let Err(err) = api::start_api_server(api_config, engine).await {
        error!("❌ Server stopped: {}", err);
        std::process::exit(1);
    }
}
