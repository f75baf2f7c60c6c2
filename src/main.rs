use activity_graph::config::Config;
use activity_graph::server::{create_router, AppState};
use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("activity_graph=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Activity Graph Service");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded (actor links: {}, combat inference: {}, body limit: {} bytes)",
        config.synthesize_actor_links, config.infer_combat_sources, config.max_body_bytes
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = create_router(AppState::new(config));

    info!("Activity Graph Service listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
