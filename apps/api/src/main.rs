use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
mod wiring;

use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting telehealth API server");

    let config = Arc::new(AppConfig::from_env());
    if !config.is_configured() {
        warn!("Configuration is incomplete; authenticated routes will reject every request");
    }

    let cells = wiring::Cells::build(config.clone());

    if config.sweeper_interval_seconds > 0 {
        let every = Duration::from_secs(config.sweeper_interval_seconds);
        info!("Expiry sweeper runs every {:?}", every);
        tokio::spawn(cells.sweeper.clone().run(every));
    } else {
        info!("Expiry sweeper disabled; use POST /appointments/admin/sweep");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(&cells)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
