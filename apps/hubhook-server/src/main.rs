mod app;
mod cli;
mod handlers;
mod server;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use crate::app::App;
use crate::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let args = Args::parse();
    telemetry::init_telemetry(&args)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        "Starting hubhook server"
    );

    let result = match App::build(args).await {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    match &result {
        Ok(()) => info!("Server stopped"),
        Err(e) => error!("Server failed: {:#}", e),
    }

    result
}
