//! Saargate HTTP server
//!
//! Starts an Axum web server fronting the configured AI providers.

use clap::Parser;
use saargate::cli::{Cli, Command, generate_config_template};
use saargate::{config::Config, handlers::AppState, telemetry};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        let template = generate_config_template();
        match output {
            Some(path) => {
                std::fs::write(&path, template)?;
                println!("Wrote configuration template to {}", path);
            }
            None => print!("{}", template),
        }
        return Ok(());
    }

    let config = Config::from_file(&cli.config)?;
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        "Starting saargate server on {}:{}",
        config.server.host,
        config.server.port
    );

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = AppState::new(config)?;
    let app = saargate::app(state);

    let addr = SocketAddr::from((
        host.parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
