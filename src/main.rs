use anyhow::Result;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use telugu_speech::config_manager::utils::{config_search_paths, load_first_existing};
use telugu_speech::config_manager::Config;
use telugu_speech::routes;
use telugu_speech::state::AppState;

fn load_config() -> Result<Config> {
    let config_paths = config_search_paths();

    match load_first_existing(&config_paths)? {
        Some((path, config)) => {
            info!("Loaded configuration from: {}", path.display());
            Ok(config)
        }
        None => {
            warn!("No config file found (tried {:?}); using defaults", config_paths);
            Ok(Config::default())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("telugu_speech=debug,tower_http=debug")),
        )
        .init();

    let config = load_config()?;
    if let Some(dir) = config.system_config.static_path() {
        if !dir.is_dir() {
            warn!("Static directory {} does not exist", dir.display());
        }
    }

    // Initialize app state
    let app_state = AppState::new(config.clone())?;
    let sweeper = app_state
        .clips
        .clone()
        .spawn_sweeper(config.system_config.clip_sweep_interval());

    // Build application
    let app = Router::new()
        .merge(routes::create_routes(&app_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let addr = config.system_config.bind_addr();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    served?;
    Ok(())
}
