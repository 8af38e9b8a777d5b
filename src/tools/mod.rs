//! MCP tool inputs for Fresco.
//!
//! This module contains the input types for the MCP tools that expose
//! Freshservice tickets and agents.

mod inputs;

pub use inputs::*;
