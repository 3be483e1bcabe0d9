//! Identity resolution for incoming connections
//!
//! Token issuance and verification live in the account service; the engine
//! only consumes the result. A connection presents its token as a query
//! parameter on the WebSocket upgrade, the resolver maps it to a user id,
//! and everything else in the engine works with that id (host checks,
//! registered-vs-guest identity).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::UserId;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a signed connection token to a user id. `None` means the
    /// token is unknown or expired; the connection then acts as a guest.
    async fn resolve(&self, token: &str) -> Option<UserId>;
}

/// Token table held in memory, for tests and single-node deployments
#[derive(Default)]
pub struct StaticIdentityResolver {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, token: impl Into<String>, user_id: impl Into<UserId>) {
        self.tokens
            .write()
            .await
            .insert(token.into(), user_id.into());
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.read().await.get(token).cloned()
    }
}
