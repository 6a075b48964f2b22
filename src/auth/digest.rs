//! HTTP Digest authentication (RFC 2617, MD5, `qop=auth`)
//!
//! ```text
//! HA1      = MD5(username:realm:password)
//! HA2      = MD5(method:uri)
//! response = MD5(HA1:nonce:nc:cnonce:qop:HA2)     qop present
//!          = MD5(HA1:nonce:HA2)                   qop absent
//! ```
//!
//! Nonces are random and not remembered; the server does not check freshness
//! or replay. The opaque token is fixed for the lifetime of the authenticator.

use std::collections::HashMap;

use super::credentials::Credentials;
use super::{strip_scheme, AuthOutcome, AuthScheme, Authenticator};

/// Generate a 32-character lowercase hex token
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Lowercase hex MD5 of `input`
fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// Fields of a Digest `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestParams {
    pub username: String,
    pub uri: String,
    pub nonce: String,
    pub response: String,
    pub realm: Option<String>,
    pub nc: Option<String>,
    pub cnonce: Option<String>,
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestParams {
    /// Parse the comma-separated `key=value` list following `Digest `
    ///
    /// Returns `None` if `username`, `uri`, `nonce` or `response` is missing.
    pub fn parse(payload: &str) -> Option<Self> {
        let mut fields = parse_fields(payload);
        let mut take = |key: &str| fields.remove(key).filter(|v| !v.is_empty());

        Some(Self {
            username: take("username")?,
            uri: take("uri")?,
            nonce: take("nonce")?,
            response: take("response")?,
            realm: take("realm"),
            nc: take("nc"),
            cnonce: take("cnonce"),
            qop: take("qop"),
            opaque: take("opaque"),
            algorithm: take("algorithm"),
        })
    }

    /// Compute the expected response for `password` under `realm`
    pub fn expected_response(&self, method: &str, realm: &str, password: &str) -> String {
        let (ha1, ha2) = self.partial_hashes(method, realm, password);
        self.response_from(&ha1, &ha2)
    }

    fn partial_hashes(&self, method: &str, realm: &str, password: &str) -> (String, String) {
        let ha1 = md5_hex(&format!("{}:{}:{}", self.username, realm, password));
        let ha2 = md5_hex(&format!("{}:{}", method, self.uri));
        (ha1, ha2)
    }

    fn response_from(&self, ha1: &str, ha2: &str) -> String {
        match &self.qop {
            Some(qop) => md5_hex(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1,
                self.nonce,
                self.nc.as_deref().unwrap_or_default(),
                self.cnonce.as_deref().unwrap_or_default(),
                qop,
                ha2
            )),
            None => md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        }
    }
}

/// Split `k1=v1, k2="v, 2"` into a map, honouring quotes
fn parse_fields(payload: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut rest = payload.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim().trim_start_matches(',').trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();

        let value;
        if let Some(quoted) = rest.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => {
                    value = &quoted[..end];
                    rest = &quoted[end + 1..];
                }
                None => {
                    value = quoted;
                    rest = "";
                }
            }
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim_end();
            rest = &rest[end..];
        }

        if !key.is_empty() {
            fields.insert(key, value.to_string());
        }

        rest = rest.trim_start().trim_start_matches(',').trim_start();
    }

    fields
}

/// Digest authentication against a credential list
#[derive(Debug, Clone)]
pub struct DigestAuth {
    realm: String,
    credentials: Credentials,
    opaque: String,
    log_digests: bool,
}

impl DigestAuth {
    pub fn new(realm: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            realm: realm.into(),
            credentials,
            opaque: generate_token(),
            log_digests: false,
        }
    }

    /// Log intermediate hashes at trace level (diagnostics only)
    pub fn log_digests(mut self, enabled: bool) -> Self {
        self.log_digests = enabled;
        self
    }

    /// Opaque token echoed by clients
    pub fn opaque(&self) -> &str {
        &self.opaque
    }

    /// Realm announced in challenges
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl Authenticator for DigestAuth {
    fn scheme(&self) -> AuthScheme {
        AuthScheme::Digest
    }

    fn challenge(&self) -> Option<String> {
        Some(format!(
            "Digest realm=\"{}\", nonce=\"{}\", stale=false, algorithm=MD5, qop=\"auth\", opaque=\"{}\"",
            self.realm,
            generate_token(),
            self.opaque
        ))
    }

    fn verify(&self, method: &str, authorization: &str) -> AuthOutcome {
        let Some(payload) = strip_scheme(authorization, "Digest") else {
            return AuthOutcome::Malformed;
        };
        let Some(params) = DigestParams::parse(payload) else {
            tracing::debug!("Digest credentials missing required fields");
            return AuthOutcome::Malformed;
        };

        if let Some(algorithm) = &params.algorithm {
            if !algorithm.eq_ignore_ascii_case("MD5") {
                tracing::debug!(algorithm = %algorithm, "Unsupported digest algorithm");
                return AuthOutcome::Malformed;
            }
        }

        let Some(credential) = self.credentials.find(&params.username) else {
            tracing::debug!(username = %params.username, "Unknown digest user");
            return AuthOutcome::Denied;
        };

        let (ha1, ha2) = params.partial_hashes(method, &self.realm, credential.password());
        let expected = params.response_from(&ha1, &ha2);

        if self.log_digests {
            tracing::trace!(
                username = %params.username,
                ha1 = %ha1,
                ha2 = %ha2,
                expected = %expected,
                received = %params.response,
                "Digest verification"
            );
        }

        if expected.eq_ignore_ascii_case(&params.response) {
            AuthOutcome::Granted
        } else {
            AuthOutcome::Denied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_RESPONSE: &str = "bdd8dae8baa89b9e366c4f094415a8c1";

    fn auth() -> DigestAuth {
        DigestAuth::new("mjpeg server", Credentials::new().with("alice", "secret"))
    }

    fn alice_header(response: &str) -> String {
        format!(
            "Digest username=\"alice\", realm=\"mjpeg server\", nonce=\"abc123\", uri=\"/\", \
             qop=auth, nc=00000001, cnonce=\"xyz\", response=\"{}\", opaque=\"ignored\"",
            response
        )
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_generate_token() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_rfc2617_vector() {
        let params = DigestParams::parse(
            "username=\"Mufasa\", realm=\"testrealm@host.com\", \
             nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", uri=\"/dir/index.html\", \
             qop=auth, nc=00000001, cnonce=\"0a4f113b\", \
             response=\"6629fae49393a05397450978507c4ef1\", \
             opaque=\"5ccc069c403ebaf9f0171e9517f40e41\"",
        )
        .unwrap();

        assert_eq!(
            params.expected_response("GET", "testrealm@host.com", "Circle Of Life"),
            "6629fae49393a05397450978507c4ef1"
        );
    }

    #[test]
    fn test_hand_computed_vector() {
        let params = DigestParams::parse(&alice_header("x")["Digest ".len()..]).unwrap();

        // HA1 = ef3fa8f39b1f192ef9402b4e6c2411ef, HA2 = 71998c64aea37ae77020c49c00f73fa8
        assert_eq!(
            params.expected_response("GET", "mjpeg server", "secret"),
            ALICE_RESPONSE
        );
    }

    #[test]
    fn test_response_without_qop() {
        let params = DigestParams::parse(
            "username=\"alice\", nonce=\"abc123\", uri=\"/\", response=\"x\"",
        )
        .unwrap();

        assert_eq!(
            params.expected_response("GET", "mjpeg server", "secret"),
            "a1a1b77483053bbb839ee7d16f936c8c"
        );
    }

    #[test]
    fn test_parse_quoted_commas() {
        let params = DigestParams::parse(
            "username=\"alice\",uri=\"/stream?a=1,b=2\",nonce=n,response=r",
        )
        .unwrap();

        assert_eq!(params.uri, "/stream?a=1,b=2");
        assert_eq!(params.nonce, "n");
        assert_eq!(params.response, "r");
        assert!(params.qop.is_none());
    }

    #[test]
    fn test_parse_missing_field() {
        assert!(DigestParams::parse("username=\"alice\", uri=\"/\", nonce=\"n\"").is_none());
        assert!(DigestParams::parse("").is_none());
    }

    #[test]
    fn test_verify_granted() {
        assert_eq!(auth().verify("GET", &alice_header(ALICE_RESPONSE)), AuthOutcome::Granted);
    }

    #[test]
    fn test_verify_uppercase_response() {
        let upper = ALICE_RESPONSE.to_ascii_uppercase();

        assert_eq!(auth().verify("GET", &alice_header(&upper)), AuthOutcome::Granted);
    }

    #[test]
    fn test_verify_wrong_response() {
        assert_eq!(
            auth().verify("GET", &alice_header("00000000000000000000000000000000")),
            AuthOutcome::Denied
        );
    }

    #[test]
    fn test_verify_method_is_bound() {
        assert_eq!(auth().verify("POST", &alice_header(ALICE_RESPONSE)), AuthOutcome::Denied);
    }

    #[test]
    fn test_verify_unknown_user() {
        let header = alice_header(ALICE_RESPONSE).replace("alice", "mallory");

        assert_eq!(auth().verify("GET", &header), AuthOutcome::Denied);
    }

    #[test]
    fn test_username_prefix_does_not_match() {
        let auth = DigestAuth::new("mjpeg server", Credentials::new().with("bobby", "secret"));
        let header = alice_header(ALICE_RESPONSE).replace("alice", "bob");

        assert_eq!(auth.verify("GET", &header), AuthOutcome::Denied);
    }

    #[test]
    fn test_verify_wrong_scheme() {
        assert_eq!(auth().verify("GET", "Basic YWxpY2U6c2VjcmV0"), AuthOutcome::Malformed);
        assert_eq!(auth().verify("GET", "Digest"), AuthOutcome::Malformed);
    }

    #[test]
    fn test_verify_unsupported_algorithm() {
        let header = format!("{}, algorithm=SHA-256", alice_header(ALICE_RESPONSE));

        assert_eq!(auth().verify("GET", &header), AuthOutcome::Malformed);
    }

    #[test]
    fn test_challenge_format() {
        let auth = auth();
        let challenge = auth.challenge().unwrap();

        assert!(challenge.starts_with("Digest realm=\"mjpeg server\", nonce=\""));
        assert!(challenge.contains(", stale=false, algorithm=MD5, qop=\"auth\", "));
        assert!(challenge.ends_with(&format!("opaque=\"{}\"", auth.opaque())));
    }

    #[test]
    fn test_challenge_nonce_changes_opaque_does_not() {
        let auth = auth();
        let nonce = |c: &str| parse_fields(&c["Digest ".len()..])["nonce"].clone();
        let opaque = |c: &str| parse_fields(&c["Digest ".len()..])["opaque"].clone();

        let first = auth.challenge().unwrap();
        let second = auth.challenge().unwrap();

        assert_ne!(nonce(&first), nonce(&second));
        assert_eq!(opaque(&first), opaque(&second));
        assert_eq!(nonce(&first).len(), 32);
    }
}
