//! Authorization decisions.
//!
//! A check starts pending and ends in exactly one terminal state: allowed, or
//! denied for a reason. There is no partial allow.

use thiserror::Error;

use crate::types::TenantId;

/// Terminal outcome of a single authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allowed,
    /// The action must not run.
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// The denial, if any.
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Decision::Allowed => None,
            Decision::Denied(denial) => Some(denial),
        }
    }

    /// Convert into a `Result` for `?` propagation.
    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

/// Why a check was denied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    /// No principal was available at decision time.
    #[error("not authenticated")]
    Unauthenticated,

    /// A principal was resolved but may not perform the action.
    #[error("forbidden: {0}")]
    Forbidden(ForbiddenReason),
}

impl Denial {
    pub fn kind(&self) -> DenialKind {
        match self {
            Denial::Unauthenticated => DenialKind::Unauthenticated,
            Denial::Forbidden(_) => DenialKind::Forbidden,
        }
    }
}

/// Coarse denial category handed to the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialKind {
    Unauthenticated,
    Forbidden,
}

/// Detail behind a `Forbidden` denial.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForbiddenReason {
    /// One or more declared permissions are not in the effective set.
    #[error("missing permissions [{}]", .0.join(", "))]
    MissingPermissions(Vec<String>),

    /// The resource belongs to another society and the principal holds no
    /// bypass role.
    #[error("resource tenant {resource} does not match principal tenant {}", display_tenant(.principal))]
    TenantMismatch {
        principal: Option<TenantId>,
        resource: TenantId,
    },

    /// The action has no registered requirement and unregistered actions are denied.
    #[error("action {0} is not registered")]
    UnregisteredAction(String),
}

fn display_tenant(tenant: &Option<TenantId>) -> String {
    match tenant {
        Some(t) => t.to_string(),
        None => "<none>".to_string(),
    }
}
