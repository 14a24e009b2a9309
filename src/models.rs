//! Core data models for the gateway

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//
// ================= Sessions =================
//

/// Identity a session became bound to through the login form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityBinding {
    pub phone_number: String,
    pub bound_at: DateTime<Utc>,
}

impl IdentityBinding {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            bound_at: Utc::now(),
        }
    }
}

//
// ================= Tools =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// Per-call context handed to the auth gate by the protocol transport.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub session_id: String,
    /// Scheme + authority used when building the login URL, without trailing `/`.
    pub base_url: String,
}

/// Payload returned (as tool result text) when a session has no identity yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginChallenge {
    pub status: String,
    pub login_url: String,
    pub message: String,
}

impl LoginChallenge {
    pub fn new(login_url: String) -> Self {
        Self {
            status: "login_required".to_string(),
            message: format!(
                "Needs to login first by going to the login url.\nShow the login url as clickable link if client supports it. Otherwise display the URL for users to copy and paste into a browser. \nAsk users to come back and let you know once they are done with login in their browser: {}",
                login_url
            ),
            login_url,
        }
    }
}

/// Result of one tool invocation after the gate has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Raw bytes of the canned dataset.
    Data(Vec<u8>),
    LoginRequired(LoginChallenge),
    Forbidden(String),
    DataUnavailable(String),
}

impl ToolOutcome {
    /// Only forbidden and unavailable outcomes are tool-level errors;
    /// a login challenge is a normal result the agent shows to its user.
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Forbidden(_) | ToolOutcome::DataUnavailable(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolOutcome::Data(_) => "data",
            ToolOutcome::LoginRequired(_) => "login_required",
            ToolOutcome::Forbidden(_) => "forbidden",
            ToolOutcome::DataUnavailable(_) => "data_unavailable",
        }
    }
}

//
// ================= Service Descriptor =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointMap {
    pub mcp: String,
    pub login_page: String,
    pub login_submit: String,
    #[serde(rename = "static")]
    pub static_assets: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: EndpointMap,
    pub allowed_identities: usize,
    pub timestamp: String,
}
