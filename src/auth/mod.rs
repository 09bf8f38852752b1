//! Authentication and authorization for the submission backend
//!
//! Provides:
//! - Bearer token issue and decode (HS256)
//! - The role gate every workflow operation passes through
//! - A typed request-scoped carrier for the decoded principal

pub mod context;
pub mod jwt;
pub mod roles;

pub use context::{require_principal, Authentication};
pub use jwt::{extract_bearer, Claims, JwtValidator, Principal};
pub use roles::{authorize, require_role, Access, Role};
