mod broadcast;
mod error;
mod pipeline;
mod store;
mod voting;
mod web;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("livepoll_server=info,warp=info")),
        )
        .init();

    web::setup().await;
}
