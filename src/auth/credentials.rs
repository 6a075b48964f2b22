//! Credential list
//!
//! Loaded once before the server starts and never mutated afterwards.

use std::path::Path;

use crate::error::{ConfigError, Result};

/// One `username:password` entry
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    /// Create a credential
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse a `username:password` line
    ///
    /// The split happens at the first colon, so passwords may contain colons.
    pub fn parse(line: &str) -> Option<Self> {
        line.split_once(':')
            .map(|(username, password)| Self::new(username, password))
    }

    /// User name
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether `line` is exactly this credential in `username:password` form
    pub fn matches_line(&self, line: &str) -> bool {
        match line.split_once(':') {
            Some((username, password)) => username == self.username && password == self.password,
            None => false,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable list of accepted credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    entries: Vec<Credential>,
}

impl Credentials {
    /// Create an empty list (authenticating schemes will then reject everyone)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from literal `username:password` lines
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();

        for (index, line) in lines.into_iter().enumerate() {
            let line = line.as_ref().trim_end_matches(|c: char| c == '\r' || c == '\n');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let credential =
                Credential::parse(line).ok_or(ConfigError::InvalidCredential(index + 1))?;
            entries.push(credential);
        }

        Ok(Self { entries })
    }

    /// Load a credentials file with one `username:password` per line
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_lines(text.lines())
    }

    /// Add a credential
    pub fn with(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.entries.push(Credential::new(username, password));
        self
    }

    /// Find the credential for `username` (exact match)
    pub fn find(&self, username: &str) -> Option<&Credential> {
        self.entries.iter().find(|c| c.username == username)
    }

    /// Whether `line` equals one of the stored `username:password` entries
    pub fn contains_line(&self, line: &str) -> bool {
        self.entries.iter().any(|c| c.matches_line(line))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_from_lines() {
        let creds = Credentials::from_lines(["# viewers", "alice:secret", "", "bob:pa:ss"]).unwrap();

        assert_eq!(creds.len(), 2);
        assert_eq!(creds.find("alice").unwrap().password(), "secret");
        assert_eq!(creds.find("bob").unwrap().password(), "pa:ss");
    }

    #[test]
    fn test_from_lines_rejects_missing_colon() {
        let result = Credentials::from_lines(["alice:secret", "bogus"]);

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidCredential(2)))
        ));
    }

    #[test]
    fn test_find_is_exact() {
        let creds = Credentials::new().with("bobby", "hunter2");

        assert!(creds.find("bob").is_none());
        assert!(creds.find("bobby").is_some());
    }

    #[test]
    fn test_contains_line() {
        let creds = Credentials::new().with("user", "pass");

        assert!(creds.contains_line("user:pass"));
        assert!(!creds.contains_line("user:pas"));
        assert!(!creds.contains_line("user:passx"));
        assert!(!creds.contains_line("userpass"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let debug = format!("{:?}", Credential::new("alice", "secret"));

        assert!(debug.contains("alice"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("mjpeg-rs-creds-{}", std::process::id()));
        std::fs::write(&path, "alice:secret\r\nbob:builder\n").unwrap();

        let creds = Credentials::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(creds.len(), 2);
        assert!(creds.contains_line("bob:builder"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Credentials::load("/nonexistent/mjpeg-rs/credentials");

        assert!(matches!(result, Err(Error::Io(_))));
    }
}
