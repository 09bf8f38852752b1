//! Request-scoped authentication context
//!
//! The server decodes the bearer credential once per request and stores the
//! outcome in the request extensions. Handlers read it back through
//! [`require_principal`], which never panics.

use hyper::Request;

use crate::auth::{extract_bearer, JwtValidator, Principal};
use crate::types::{AuthError, MicError};

/// What the credential on a request decoded to
#[derive(Debug, Clone)]
pub enum Authentication {
    Anonymous,
    Authenticated(Principal),
    Rejected(AuthError),
}

impl Authentication {
    /// Decode the `Authorization` header value, if any.
    pub fn from_header(validator: &JwtValidator, header: Option<&str>) -> Self {
        match extract_bearer(header) {
            Ok(token) => match validator.decode(token) {
                Ok(principal) => Authentication::Authenticated(principal),
                Err(e) => Authentication::Rejected(e),
            },
            Err(AuthError::Missing) => Authentication::Anonymous,
            Err(e) => Authentication::Rejected(e),
        }
    }

    /// Decode the credential on `req` and attach the result to its extensions.
    pub fn attach<B>(validator: &JwtValidator, req: &mut Request<B>) {
        let header = req
            .headers()
            .get(hyper::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let auth = Self::from_header(validator, header);
        req.extensions_mut().insert(auth);
    }
}

/// Fetch the authenticated principal for this request.
pub fn require_principal<B>(req: &Request<B>) -> Result<&Principal, MicError> {
    match req.extensions().get::<Authentication>() {
        Some(Authentication::Authenticated(principal)) => Ok(principal),
        Some(Authentication::Rejected(e)) => Err(MicError::Unauthorized(*e)),
        Some(Authentication::Anonymous) | None => Err(MicError::Unauthorized(AuthError::Missing)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    #[test]
    fn test_missing_extension_is_unauthorized() {
        let req = Request::new(());
        assert!(matches!(
            require_principal(&req),
            Err(MicError::Unauthorized(AuthError::Missing))
        ));
    }

    #[test]
    fn test_attach_valid_token() {
        let validator = JwtValidator::new_dev();
        let token = validator.generate_token("f-1", Role::Faculty, "f@example.edu").unwrap();
        let mut req = Request::builder()
            .header("Authorization", format!("Bearer {}", token))
            .body(())
            .unwrap();

        Authentication::attach(&validator, &mut req);
        let principal = require_principal(&req).unwrap();
        assert_eq!(principal.identity, "f-1");
        assert_eq!(principal.role, Role::Faculty);
    }

    #[test]
    fn test_attach_rejected_token() {
        let validator = JwtValidator::new_dev();
        let mut req = Request::builder()
            .header("Authorization", "Bearer garbage")
            .body(())
            .unwrap();

        Authentication::attach(&validator, &mut req);
        assert!(matches!(
            require_principal(&req),
            Err(MicError::Unauthorized(AuthError::Malformed))
        ));
    }

    #[test]
    fn test_no_header_is_anonymous() {
        let validator = JwtValidator::new_dev();
        let mut req = Request::new(());
        Authentication::attach(&validator, &mut req);
        assert!(matches!(
            req.extensions().get::<Authentication>(),
            Some(Authentication::Anonymous)
        ));
    }
}
