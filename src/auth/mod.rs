//! HTTP authentication for viewers
//!
//! The server speaks one scheme, chosen by configuration:
//!
//! | scheme   | challenge                                   | verification                       |
//! |----------|---------------------------------------------|------------------------------------|
//! | `none`   | -                                           | everyone is admitted               |
//! | `basic`  | `Basic realm="..."`                         | decoded `user:pass` equals an entry |
//! | `digest` | `Digest realm, nonce, stale, algorithm, qop, opaque` | RFC 2617 MD5 `auth` response |
//!
//! Verification is a pure function of the `Authorization` header, the
//! request method and the credential list. It never touches the socket; the
//! acceptor maps the [`AuthOutcome`] to a response.

pub mod basic;
pub mod credentials;
pub mod digest;

use std::str::FromStr;
use std::sync::Arc;

pub use basic::BasicAuth;
pub use credentials::{Credential, Credentials};
pub use digest::DigestAuth;

use crate::error::ConfigError;

/// Default realm announced in challenges
pub const DEFAULT_REALM: &str = "mjpeg server";

/// Authentication scheme selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// No authentication
    None,
    /// HTTP Basic
    Basic,
    /// HTTP Digest (MD5, qop=auth)
    #[default]
    Digest,
}

impl FromStr for AuthScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(AuthScheme::None),
            "basic" => Ok(AuthScheme::Basic),
            "digest" => Ok(AuthScheme::Digest),
            _ => Err(ConfigError::UnknownAuthScheme(s.to_string())),
        }
    }
}

impl std::fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuthScheme::None => "none",
            AuthScheme::Basic => "basic",
            AuthScheme::Digest => "digest",
        };
        f.write_str(name)
    }
}

/// Result of checking an `Authorization` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials accepted
    Granted,
    /// Well-formed header with wrong credentials (answered with 401)
    Denied,
    /// Unparseable header or unsupported scheme (answered with 400)
    Malformed,
}

/// Authentication capability used by the acceptor
pub trait Authenticator: Send + Sync {
    /// Scheme implemented
    fn scheme(&self) -> AuthScheme;

    /// Value for a fresh `WWW-Authenticate` header, or `None` when no
    /// authentication is required
    fn challenge(&self) -> Option<String>;

    /// Check the `Authorization` header value sent with a `method` request
    fn verify(&self, method: &str, authorization: &str) -> AuthOutcome;
}

/// Admits every viewer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::None
    }

    fn challenge(&self) -> Option<String> {
        None
    }

    fn verify(&self, _method: &str, _authorization: &str) -> AuthOutcome {
        AuthOutcome::Granted
    }
}

/// Build the authenticator for `scheme`
pub fn build(
    scheme: AuthScheme,
    realm: &str,
    credentials: Credentials,
    log_digests: bool,
) -> Arc<dyn Authenticator> {
    match scheme {
        AuthScheme::None => Arc::new(NoAuth),
        AuthScheme::Basic => Arc::new(BasicAuth::new(realm, credentials)),
        AuthScheme::Digest => Arc::new(DigestAuth::new(realm, credentials).log_digests(log_digests)),
    }
}

/// Split `"<Scheme> <payload>"`, matching the scheme name case-insensitively
///
/// Returns `None` when there is no space separator or the scheme differs.
fn strip_scheme<'a>(authorization: &'a str, scheme: &str) -> Option<&'a str> {
    let (name, payload) = authorization.trim().split_once(' ')?;
    if name.eq_ignore_ascii_case(scheme) {
        Some(payload.trim_start())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_str() {
        assert_eq!("none".parse::<AuthScheme>().unwrap(), AuthScheme::None);
        assert_eq!("Basic".parse::<AuthScheme>().unwrap(), AuthScheme::Basic);
        assert_eq!(" DIGEST ".parse::<AuthScheme>().unwrap(), AuthScheme::Digest);
        assert_eq!(
            "ntlm".parse::<AuthScheme>(),
            Err(ConfigError::UnknownAuthScheme("ntlm".into()))
        );
    }

    #[test]
    fn test_scheme_display_roundtrip() {
        for scheme in [AuthScheme::None, AuthScheme::Basic, AuthScheme::Digest] {
            assert_eq!(scheme.to_string().parse::<AuthScheme>().unwrap(), scheme);
        }
    }

    #[test]
    fn test_no_auth() {
        let auth = build(AuthScheme::None, DEFAULT_REALM, Credentials::new(), false);

        assert_eq!(auth.scheme(), AuthScheme::None);
        assert!(auth.challenge().is_none());
        assert_eq!(auth.verify("GET", "anything"), AuthOutcome::Granted);
    }

    #[test]
    fn test_build_selects_scheme() {
        let creds = Credentials::new().with("user", "pass");

        assert_eq!(
            build(AuthScheme::Basic, DEFAULT_REALM, creds.clone(), false).scheme(),
            AuthScheme::Basic
        );
        assert_eq!(
            build(AuthScheme::Digest, DEFAULT_REALM, creds, false).scheme(),
            AuthScheme::Digest
        );
    }

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("Basic abc", "Basic"), Some("abc"));
        assert_eq!(strip_scheme("basic   abc", "Basic"), Some("abc"));
        assert_eq!(strip_scheme("Digest abc", "Basic"), None);
        assert_eq!(strip_scheme("Basic", "Basic"), None);
    }
}
