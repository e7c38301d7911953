//! Per-request memo of resolutions.
//!
//! A `RequestScope` lives for one request. When several checks in the same
//! request ask about the same principal, the first resolution is reused as
//! long as the store revision has not moved. Any role or permission
//! mutation bumps the revision, so a stale entry is never served.

use std::collections::HashMap;
use std::sync::Arc;

use gatehouse_core::PrincipalId;
use gatehouse_store::Store;
use tokio::sync::Mutex;
use tracing::debug;

use crate::engine::{PermissionEngine, Resolution};
use crate::error::Result;

/// Request-lifetime cache of principal resolutions.
#[derive(Debug, Default)]
pub struct RequestScope {
    entries: Mutex<HashMap<PrincipalId, Arc<Resolution>>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve through the cache.
    pub async fn resolve<S: Store>(
        &self,
        engine: &PermissionEngine<S>,
        principal: PrincipalId,
    ) -> Result<Arc<Resolution>> {
        let current = engine.store().revision().await?;

        let mut entries = self.entries.lock().await;
        if let Some(hit) = entries.get(&principal) {
            if hit.revision == current {
                return Ok(hit.clone());
            }
        }

        debug!(%principal, revision = current, "request scope miss");
        let fresh = Arc::new(engine.resolve(principal).await?);
        entries.insert(principal, fresh.clone());
        Ok(fresh)
    }

    /// Drop every cached resolution.
    pub async fn invalidate(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
