// src/main.rs

use std::path::Path;
use std::str::FromStr;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use berea::config::CONFIG;
use berea::llm::CompletionClient;
use berea::{api, server, AppState};

#[derive(Parser, Debug)]
#[command(name = "berea", about = "Streaming scripture-chat backend")]
struct Args {
    /// Bind address (overrides BEREA_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides BEREA_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = Level::from_str(&CONFIG.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Berea backend");
    info!("Model: {}", CONFIG.model);

    let pool = server::db::create_pool(&CONFIG.database_url).await?;
    server::db::run_migrations(&pool, Path::new("./migrations")).await?;

    let llm = CompletionClient::new()?;
    let state = AppState::new(pool, llm);
    let app = api::http::create_router(state);

    let host = args.host.unwrap_or_else(|| CONFIG.host.clone());
    let port = args.port.unwrap_or(CONFIG.port);
    let bind_address = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
