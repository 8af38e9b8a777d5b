//! # Fresco
//!
//! Fresco is a client library for the Freshservice v2 REST API, with a small
//! MCP (Model Context Protocol) server on top.
//!
//! ## Features
//!
//! - **Retrying requests**: GETs are retried on connection-level failures only,
//!   up to five times, with every failed attempt logged
//! - **Query compilation**: ticket constraints and `field:value` filters are
//!   compiled into Freshservice query strings
//! - **Resources**: tickets, agents and agent assignment history
//! - **Security**: API keys are never logged and are redacted from error text
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with message sanitization
//! - [`transport`] - The HTTP seam, with a reqwest implementation
//! - [`requester`] - Retry loop and failure classification
//! - [`query`] - Query string and filter compilation
//! - [`client`] - Resource accessors for tickets and agents
//! - [`models`] - Data models for API responses
//! - [`server`] - MCP server exposing the accessors as tools
//! - [`tools`] - Tool input parameter structs
//!
//! ## Configuration
//!
//! - `FRESHSERVICE_DOMAIN`: Your Freshservice domain (e.g. `acme.freshservice.com`)
//! - `FRESHSERVICE_API_KEY`: Agent API key
//! - `FRESHSERVICE_TIMEOUT_SECS`, `FRESHSERVICE_VERIFY_SSL`: optional
//! - `RUST_LOG`: Log level (e.g., `fresco=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use fresco::client::FreshClient;
//! use fresco::config::Config;
//! use fresco::query::{FieldFilters, TicketListParams};
//!
//! async fn example() -> Result<(), fresco::error::FreshError> {
//!     let config = Config::from_env()?;
//!     let client = FreshClient::new(&config)?;
//!
//!     // Urgent open tickets
//!     let params = TicketListParams::new()
//!         .with_filters(FieldFilters::new().with("priority", 4).with("status", 2));
//!
//!     for ticket in client.get_tickets(&params).await? {
//!         println!("#{}: {}", ticket.id, ticket.display_subject());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod requester;
pub mod server;
pub mod tools;
pub mod transport;
