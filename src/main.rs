use anyhow::Context;
use tokio::net::TcpListener;

mod ai;
mod app;
mod articles;
mod cache;
mod config;
mod db;
mod error;
mod http;
mod models;
mod pageviews;
mod services;
#[cfg(test)]
mod testing;
mod uploads;

use app::App;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (info for this crate unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wikimasters=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    let app = App::new(config)
        .await
        .context("failed to initialize application")?;

    // Check for --seed flag (reset articles to sample data)
    if args.len() >= 2 && args[1] == "--seed" {
        let count = app.seed().await.context("seeding failed")?;
        println!("Inserted {} articles", count);
        return Ok(());
    }

    // Check for --summarize flag (headless summary sweep)
    if args.len() >= 2 && args[1] == "--summarize" {
        let updated = app
            .articles
            .summarize_missing()
            .await
            .context("summary sweep failed")?;
        println!("Summarized {} articles", updated);
        return Ok(());
    }

    let bind_addr = app.config.bind_addr.clone();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, http::router(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
