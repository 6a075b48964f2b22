//! HTTP Basic authentication

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::credentials::Credentials;
use super::{strip_scheme, AuthOutcome, AuthScheme, Authenticator};

/// Basic authentication against a credential list
#[derive(Debug, Clone)]
pub struct BasicAuth {
    realm: String,
    credentials: Credentials,
}

impl BasicAuth {
    pub fn new(realm: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            realm: realm.into(),
            credentials,
        }
    }
}

impl Authenticator for BasicAuth {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::Basic
    }

    fn challenge(&self) -> Option<String> {
        Some(format!("Basic realm=\"{}\"", self.realm))
    }

    fn verify(&self, _method: &str, authorization: &str) -> AuthOutcome {
        let Some(payload) = strip_scheme(authorization, "Basic") else {
            return AuthOutcome::Malformed;
        };

        let decoded = match STANDARD.decode(payload.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Invalid base64 in Basic credentials");
                return AuthOutcome::Malformed;
            }
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return AuthOutcome::Malformed;
        };

        if self.credentials.contains_line(&decoded) {
            AuthOutcome::Granted
        } else {
            AuthOutcome::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> BasicAuth {
        BasicAuth::new("mjpeg server", Credentials::new().with("user", "pass"))
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(STANDARD.decode("dXNlcjpwYXNz").unwrap(), b"user:pass");
    }

    #[test]
    fn test_challenge() {
        assert_eq!(auth().challenge().unwrap(), "Basic realm=\"mjpeg server\"");
    }

    #[test]
    fn test_valid_credentials() {
        assert_eq!(auth().verify("GET", "Basic dXNlcjpwYXNz"), AuthOutcome::Granted);
    }

    #[test]
    fn test_wrong_password() {
        // user:wrong
        assert_eq!(auth().verify("GET", "Basic dXNlcjp3cm9uZw=="), AuthOutcome::Denied);
    }

    #[test]
    fn test_missing_colon_denied() {
        // nocolon
        assert_eq!(auth().verify("GET", "Basic bm9jb2xvbg=="), AuthOutcome::Denied);
    }

    #[test]
    fn test_invalid_base64() {
        assert_eq!(auth().verify("GET", "Basic !!!not-base64"), AuthOutcome::Malformed);
    }

    #[test]
    fn test_wrong_scheme() {
        assert_eq!(
            auth().verify("GET", "Digest username=\"user\""),
            AuthOutcome::Malformed
        );
        assert_eq!(auth().verify("GET", "dXNlcjpwYXNz"), AuthOutcome::Malformed);
    }

    #[test]
    fn test_empty_credential_list_denies() {
        let auth = BasicAuth::new("mjpeg server", Credentials::new());

        assert_eq!(auth.verify("GET", "Basic dXNlcjpwYXNz"), AuthOutcome::Denied);
    }
}
