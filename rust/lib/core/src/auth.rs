//! Authorization gate for business modules.
//!
//! Modules do NOT read ambient session state. The API layer parses a
//! [`Role`] from the request (via a pluggable [`Authenticator`]), converts
//! it into a [`WriteAccess`] capability with [`require_write`], and passes
//! that token into every mutating service call. A service method that
//! mutates data without holding a `WriteAccess` does not typecheck.

use std::str::FromStr;

use axum::http::HeaderMap;

use crate::ServiceError;

/// Request header carrying the caller's role.
pub const ROLE_HEADER: &str = "x-labtrack-role";

/// Caller role, as established by the surrounding deployment
/// (reverse proxy, SSO gateway, test harness).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full access, including batch and pipet mutation.
    Admin,
    /// Lab analyst — may mutate batches, tests, pipets and projects.
    Analyst,
    /// Read-only access.
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
            Role::Member => "member",
        }
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "analyst" => Ok(Role::Analyst),
            "member" => Ok(Role::Member),
            other => Err(ServiceError::Unauthorized(format!("unknown role '{}'", other))),
        }
    }
}

/// Capability token proving the caller may mutate lab data.
///
/// Only [`require_write`] constructs one. Mutating service methods take
/// `&WriteAccess` as evidence the gate already ran.
#[derive(Debug)]
pub struct WriteAccess {
    _priv: (),
}

/// Evaluate the write gate: admin and analyst may mutate, member may not.
pub fn require_write(role: Role) -> Result<WriteAccess, ServiceError> {
    match role {
        Role::Admin | Role::Analyst => Ok(WriteAccess { _priv: () }),
        Role::Member => Err(ServiceError::PermissionDenied(
            "role 'member' may not modify lab records".into(),
        )),
    }
}

/// Pluggable authenticator. The API layer calls this for every request
/// and receives the caller's [`Role`].
///
/// The concrete implementation is injected at startup time; the business
/// module only knows this trait.
pub trait Authenticator: Send + Sync + 'static {
    /// Establish the caller's role from the request headers.
    ///
    /// Returns `Err(ServiceError::Unauthorized)` when the request carries
    /// no usable identity.
    fn authenticate(&self, headers: &HeaderMap) -> Result<Role, ServiceError>;
}

/// Reads the role from the [`ROLE_HEADER`] request header. Suitable when
/// an upstream gateway has already authenticated the user and asserts the
/// role on proxied requests.
pub struct HeaderAuth;

impl Authenticator for HeaderAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<Role, ServiceError> {
        let raw = headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing role header".into()))?;
        raw.parse()
    }
}

/// An authenticator that grants everyone admin. Used for testing.
pub struct AllowAll;

impl Authenticator for AllowAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Role, ServiceError> {
        Ok(Role::Admin)
    }
}

/// An authenticator that rejects everything. Used for testing.
pub struct DenyAll;

impl Authenticator for DenyAll {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<Role, ServiceError> {
        Err(ServiceError::Unauthorized("access denied".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("analyst".parse::<Role>().unwrap(), Role::Analyst);
        assert_eq!("member".parse::<Role>().unwrap(), Role::Member);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn write_gate() {
        assert!(require_write(Role::Admin).is_ok());
        assert!(require_write(Role::Analyst).is_ok());
        let err = require_write(Role::Member).unwrap_err();
        assert_eq!(err.error_code(), "PERMISSION_DENIED");
    }

    #[test]
    fn header_auth() {
        let mut headers = HeaderMap::new();
        assert!(HeaderAuth.authenticate(&headers).is_err());

        headers.insert(ROLE_HEADER, "analyst".parse().unwrap());
        assert_eq!(HeaderAuth.authenticate(&headers).unwrap(), Role::Analyst);

        headers.insert(ROLE_HEADER, "intruder".parse().unwrap());
        assert!(HeaderAuth.authenticate(&headers).is_err());
    }

    #[test]
    fn allow_and_deny() {
        let headers = HeaderMap::new();
        assert_eq!(AllowAll.authenticate(&headers).unwrap(), Role::Admin);
        assert!(DenyAll.authenticate(&headers).is_err());
    }
}
