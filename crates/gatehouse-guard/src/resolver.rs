//! Principal resolution from bearer credentials.
//!
//! Turns an `Authorization` header into the authenticated [`Principal`] with
//! its roles loaded. Bad credentials are not errors: they resolve to `None`
//! and the guard answers `Unauthenticated`. Only store failures propagate.

use std::sync::Arc;

use gatehouse_core::token::fingerprint;
use gatehouse_core::{Principal, PrincipalId, TokenVerifier};
use gatehouse_store::{Store, StoreExt};
use tracing::debug;

use crate::error::Result;

const BEARER: &str = "bearer";

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case(BEARER) {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Resolves bearer tokens to principals.
pub struct PrincipalResolver<S: Store> {
    store: Arc<S>,
    verifier: TokenVerifier,
}

impl<S: Store> PrincipalResolver<S> {
    pub fn new(store: Arc<S>, verifier: TokenVerifier) -> Self {
        Self { store, verifier }
    }

    /// Resolve an optional `Authorization` header value.
    pub async fn resolve_bearer(&self, authorization: Option<&str>) -> Result<Option<Principal>> {
        let Some(header) = authorization else {
            debug!("no authorization header");
            return Ok(None);
        };
        let Some(token) = bearer_token(header) else {
            debug!("authorization header is not a bearer credential");
            return Ok(None);
        };
        self.resolve_token(token).await
    }

    /// Verify a raw token and load its principal.
    pub async fn resolve_token(&self, token: &str) -> Result<Option<Principal>> {
        let claims = match self.verifier.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(token = %fingerprint(token), error = %e, "rejected bearer token");
                return Ok(None);
            }
        };

        let principal = self.resolve_id(claims.sub).await?;
        if principal.is_none() {
            debug!(
                token = %fingerprint(token),
                principal = %claims.sub,
                "bearer token names an unknown principal"
            );
        }
        Ok(principal)
    }

    /// Load a principal by id with its roles.
    pub async fn resolve_id(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.store.load_principal(id).await?)
    }
}
