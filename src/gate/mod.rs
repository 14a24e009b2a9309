//! Auth gate
//!
//! Every tool call passes through here:
//! SESSION LOOKUP → (store error) DATA UNAVAILABLE
//!                → (unbound) LOGIN CHALLENGE
//!                → (bound, not allowed) FORBIDDEN
//!                → (bound, allowed) FORWARD TO HANDLER
//!
//! Identities are checked against the dataset at call time, never at login.
//! The gate only reads the session store.

use crate::dataset::DatasetResolver;
use crate::models::{CallContext, LoginChallenge, ToolOutcome};
use crate::session::SessionStore;
use crate::tools::ToolHandler;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const LOGIN_PAGE_PATH: &str = "/mockWebPage";

pub struct AuthGate {
    sessions: Arc<dyn SessionStore>,
    dataset: Arc<DatasetResolver>,
    inner: Arc<dyn ToolHandler>,
}

impl AuthGate {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        dataset: Arc<DatasetResolver>,
        inner: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            sessions,
            dataset,
            inner,
        }
    }

    pub async fn invoke(&self, ctx: &CallContext, tool_name: &str) -> ToolOutcome {
        let binding = match self.sessions.lookup(&ctx.session_id).await {
            Ok(binding) => binding,
            Err(e) => {
                warn!(session_id = %ctx.session_id, error = %e, "session lookup failed");
                return ToolOutcome::DataUnavailable(format!("error reading session store: {}", e));
            }
        };

        let Some(binding) = binding else {
            debug!(session_id = %ctx.session_id, tool = tool_name, "no identity bound, issuing login challenge");
            return ToolOutcome::LoginRequired(LoginChallenge::new(login_url(
                &ctx.base_url,
                &ctx.session_id,
            )));
        };

        let phone_number = binding.phone_number.as_str();
        match self.dataset.is_allowed(phone_number).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(session_id = %ctx.session_id, phone_number, tool = tool_name, "identity not in allowed set");
                return ToolOutcome::Forbidden(format!(
                    "phone number {} is not allowed",
                    phone_number
                ));
            }
            Err(e) => {
                warn!(error = %e, "cannot read allowed identity set");
                return ToolOutcome::DataUnavailable(format!(
                    "error reading test data directory: {}",
                    e
                ));
            }
        }

        info!(session_id = %ctx.session_id, phone_number, tool = tool_name, "forwarding authorized tool call");
        self.inner.handle(phone_number, tool_name).await
    }
}

/// `<base>/mockWebPage?sessionId=<session_id>`
pub fn login_url(base_url: &str, session_id: &str) -> String {
    format!(
        "{}{}?sessionId={}",
        base_url.trim_end_matches('/'),
        LOGIN_PAGE_PATH,
        urlencoding::encode(session_id)
    )
}
