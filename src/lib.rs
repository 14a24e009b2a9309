//! Fi MCP Gateway
//!
//! An MCP server that advertises a fixed catalog of financial data tools and
//! gates every call behind a per-session, phone-number based login:
//! - Sessions are bound to a phone number through a small login web page
//! - Bound numbers are authorized against the dataset directories at call time
//! - Authorized calls return the canned JSON for that number and tool
//!
//! CALL FLOW:
//! TOOL CALL → SESSION LOOKUP → (login challenge | forbidden | canned data)

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod gate;
pub mod mcp;
pub mod models;
pub mod session;
pub mod tools;
pub mod web;

pub use error::{GatewayError, Result};

// Re-export common types
pub use models::*;
pub use gate::AuthGate;
pub use session::{InMemorySessionStore, SessionStore};
