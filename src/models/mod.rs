//! Data models for the Freshservice API.
//!
//! Only the commonly used fields are typed; everything else the API returns
//! is kept in each record's `extra` map.

mod agent;
mod ticket;

pub use agent::*;
pub use ticket::*;
