//! Session store
//!
//! Maps protocol session ids to the identity chosen on the login page.
//! Bindings live for the lifetime of the process; there is no expiry and
//! no logout.

use crate::models::IdentityBinding;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for session binding storage
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert: binding an already bound session replaces its identity.
    async fn bind(&self, session_id: &str, phone_number: &str) -> Result<()>;
    async fn lookup(&self, session_id: &str) -> Result<Option<IdentityBinding>>;
    async fn len(&self) -> usize;
}

/// In-memory session store
pub struct InMemorySessionStore {
    bindings: Arc<RwLock<HashMap<String, IdentityBinding>>>, // session_id → identity
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            bindings: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn bind(&self, session_id: &str, phone_number: &str) -> Result<()> {
        let mut bindings = self.bindings.write().await;
        bindings.insert(session_id.to_string(), IdentityBinding::new(phone_number));
        Ok(())
    }

    async fn lookup(&self, session_id: &str) -> Result<Option<IdentityBinding>> {
        let bindings = self.bindings.read().await;
        Ok(bindings.get(session_id).cloned())
    }

    async fn len(&self) -> usize {
        self.bindings.read().await.len()
    }
}
