//! StudySpot Live server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use studyspot_live::config::Config;
use studyspot_live::viewmodel::SpotViewModel;
use studyspot_live::{build_repository, create_router, open_store, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!("Starting StudySpot Live");
    tracing::info!("Store: {:?}", config.store);
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Collection: {}", config.collection);
    tracing::info!("Remote timeout: {:?}", config.remote_timeout);
    tracing::info!("Bind address: {}", config.bind_addr);

    if let Some(seed) = &config.seed_spot_name {
        tracing::info!("Empty collection will be seeded with {:?}", seed);
    }

    let store = open_store(&config).await?;
    let repo = build_repository(store, &config);

    // Construction starts the first fetch
    let view_model = SpotViewModel::new(repo);

    let app = create_router(AppState { view_model });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
