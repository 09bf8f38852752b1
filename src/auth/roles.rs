//! Role gate for workflow operations
//!
//! A pure predicate over a principal's role. Ownership checks are separate and
//! live with the operations that need them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::Principal;
use crate::types::MicError;

/// Roles a principal can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Student,
    Faculty,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "STUDENT"),
            Role::Faculty => write!(f, "FACULTY"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Outcome of the role gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Permit the principal when its role is in `allowed`.
pub fn authorize(principal: &Principal, allowed: &[Role]) -> Access {
    if allowed.contains(&principal.role) {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// Role gate as a fallible step: `Deny` becomes `Forbidden`.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), MicError> {
    match authorize(principal, allowed) {
        Access::Allow => Ok(()),
        Access::Deny => Err(MicError::Forbidden(format!(
            "role {} may not perform this operation",
            principal.role
        ))),
    }
}
