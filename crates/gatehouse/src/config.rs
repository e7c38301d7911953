//! Configuration for a Gatehouse instance.

use std::path::Path;

use gatehouse_core::{Keypair, PublicKey, RequirementMap, TokenIssuer, TokenVerifier};
use gatehouse_guard::{GuardPolicy, DEFAULT_SUPER_ROLE};
use serde::{Deserialize, Serialize};

use crate::error::{GatehouseError, Result};

/// Role attached to newly registered principals.
pub const DEFAULT_ROLE: &str = "USER";

/// Default bearer token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Configuration for Gatehouse.
///
/// Every field has a default, so a JSON file only needs the fields it
/// changes. Usually it carries at least the `actions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    /// Role that bypasses tenant scoping.
    pub super_role: String,
    /// Role attached on registration, if it exists. `null` disables it.
    pub default_role: Option<String>,
    /// Deny actions absent from `actions` instead of treating them as open.
    pub deny_unregistered_actions: bool,
    /// Lifetime of issued bearer tokens in milliseconds.
    pub token_ttl_ms: i64,
    /// Hex Ed25519 key that bearer tokens are checked against.
    pub token_public_key: Option<PublicKey>,
    /// Action id to required permission names.
    pub actions: RequirementMap,
}

impl Default for GatehouseConfig {
    fn default() -> Self {
        Self {
            super_role: DEFAULT_SUPER_ROLE.to_string(),
            default_role: Some(DEFAULT_ROLE.to_string()),
            deny_unregistered_actions: false,
            token_ttl_ms: DEFAULT_TOKEN_TTL_MS,
            token_public_key: None,
            actions: RequirementMap::new(),
        }
    }
}

impl GatehouseConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GatehouseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| GatehouseError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GatehouseError::Config(e.to_string()))
    }

    pub fn with_actions(mut self, actions: RequirementMap) -> Self {
        self.actions = actions;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !is_name(&self.super_role) {
            return Err(GatehouseError::Config(format!(
                "super_role must be a trimmed role name, got {:?}",
                self.super_role
            )));
        }
        if matches!(&self.default_role, Some(role) if !is_name(role)) {
            return Err(GatehouseError::Config(
                "default_role must be null or a trimmed role name".into(),
            ));
        }
        if self.token_ttl_ms <= 0 {
            return Err(GatehouseError::Config(format!(
                "token_ttl_ms must be positive, got {}",
                self.token_ttl_ms
            )));
        }
        for (action, requirement) in self.actions.iter() {
            if !is_name(action) {
                return Err(GatehouseError::Config(format!("bad action id {:?}", action)));
            }
            if let Some(name) = requirement.permissions().iter().find(|p| !is_name(p)) {
                return Err(GatehouseError::Config(format!(
                    "action {} lists a bad permission name {:?}",
                    action, name
                )));
            }
        }
        Ok(())
    }

    pub fn guard_policy(&self) -> GuardPolicy {
        GuardPolicy {
            super_role: self.super_role.clone(),
            deny_unregistered_actions: self.deny_unregistered_actions,
        }
    }

    /// A token issuer using the configured ttl.
    pub fn token_issuer(&self, keypair: Keypair) -> TokenIssuer {
        TokenIssuer::new(keypair, self.token_ttl_ms)
    }

    /// The verifier for `token_public_key`, if one is configured.
    pub fn token_verifier(&self) -> Option<TokenVerifier> {
        self.token_public_key.map(TokenVerifier::new)
    }
}

/// Stored names are trimmed, so a padded name in the config could never match.
fn is_name(s: &str) -> bool {
    !s.is_empty() && s.trim() == s
}
