use culinary_cms::{
    AppState, FirebaseStore, MemoryStore, StoreState,
    auth::ensure_admin_account,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, initializes logging, picks the document store, seeds the
/// bootstrap admin and serves the API.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    // Fail-fast: panics on missing production settings.
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "culinary_cms=debug,tower_http=info,axum=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    let store: StoreState = match &config.firebase_url {
        Some(url) => {
            tracing::info!(%url, "using Firebase Realtime Database");
            Arc::new(FirebaseStore::new(url, config.firebase_auth.clone()))
        }
        None => {
            // Only reachable locally; production requires the URL.
            tracing::warn!("FIREBASE_DATABASE_URL not set, data lives in memory and is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let port = config.port;
    let state = AppState::new(store, config);

    match ensure_admin_account(&state.repo, &state.config).await {
        Ok(Some(admin)) => tracing::info!(email = %admin.email, "bootstrap admin ready"),
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "FATAL: could not create the bootstrap admin");
            std::process::exit(1);
        }
    }

    let app = create_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("FATAL: could not bind the HTTP port");

    tracing::info!("Listening on 0.0.0.0:{port}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly");
}
