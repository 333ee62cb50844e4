use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookscout::config::Config;
use bookscout::proxy;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookscout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let (client_id, client_secret) = match (
        config.streaming_client_id.clone(),
        config.streaming_client_secret.clone(),
    ) {
        (Some(id), Some(secret)) => (id, secret),
        _ => {
            tracing::error!("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set");
            std::process::exit(1);
        }
    };

    let app = proxy::router(&config, &client_id, &client_secret);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Token proxy listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
