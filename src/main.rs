//! Fresco - MCP server for Freshservice
//!
//! Runs an MCP server over stdio exposing read-only Freshservice
//! ticket and agent lookups.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `FRESHSERVICE_DOMAIN`: Your Freshservice domain
//! - `FRESHSERVICE_API_KEY`: Agent API key
//!
//! # Usage
//!
//! ```bash
//! FRESHSERVICE_DOMAIN=acme.freshservice.com FRESHSERVICE_API_KEY=xxx ./fresco
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use fresco::{client::FreshClient, config::Config, server::FrescoServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (missing file is fine)
    dotenvy::dotenv().ok();

    // stdout carries MCP JSON-RPC, so logs go to stderr
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fresco=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting Fresco MCP server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        domain = %config.domain,
        timeout_secs = config.timeout.as_secs(),
        verify_ssl = config.verify_ssl,
        "Configuration loaded"
    );

    // Create the Freshservice client
    let client = FreshClient::new(&config).context("Failed to create Freshservice client")?;

    // Test connection to Freshservice before starting
    tracing::info!("Testing connection to Freshservice...");
    if let Err(e) = client.test_connection().await {
        tracing::error!(error = %e.sanitized_display(config.api_key()), "Connection test failed");
        tracing::warn!(
            "Server will start but may not be able to reach Freshservice. \
             Check configuration and network connectivity."
        );
    }

    // Create the MCP server
    let server = FrescoServer::new(client);

    tracing::info!("Server initialized, starting stdio transport");

    // Serve on stdio transport
    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    // Wait for the client to disconnect
    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}
