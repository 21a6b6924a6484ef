mod config;
mod registry;
mod routes;
mod state;

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables take precedence.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("no .env loaded: {e}");
    }
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::from_env().expect("invalid server configuration");
    let state = state::AppState::new(&config);

    // Spawn background pruning of abandoned leases.
    let _pruning = registry::spawn_prune_task(state.registry.clone(), config.prune_interval);

    let app = match routes::leptos_app(state.clone()) {
        Ok(app) => app,
        Err(e) => {
            tracing::warn!(error = %e, "leptos site not configured; serving API routes only");
            routes::app(state)
        }
    };

    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, stale_after_ms = config.session.stale_after_ms, "session server listening");
    axum::serve(listener, app).await.expect("server failed");
}
