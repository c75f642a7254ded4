//! Auth header values held as secrets.
//!
//! Values are boxed with `secrecy` and print as `[REDACTED]`, so a config
//! or header set can be logged with `{:?}` without leaking a token.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// A header value that formats as `[REDACTED]`.
pub struct SecretString(SecretBox<str>);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    /// The raw value. Only the transport should need this.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(SecretBox::new(value.into_boxed_str()))
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(SecretBox::new(Box::from(value)))
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::from(self.expose())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Headers attached to every probe.
///
/// Opaque to the prober: how the credentials were obtained is the caller's
/// business. Header names are kept verbatim; values are secret.
#[derive(Clone, Default)]
pub struct AuthHeaders {
    headers: Vec<(String, SecretString)>,
}

impl AuthHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header, replacing any existing header with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<SecretString>) -> Self {
        self.insert(name, value);
        self
    }

    /// `Authorization: Bearer <token>`.
    pub fn with_bearer_token(self, token: impl AsRef<str>) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token.as_ref()))
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SecretString>) {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretString)> {
        self.headers.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> Vec<&str> {
        self.headers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.headers.iter().map(|(name, value)| (name, value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_redacted() {
        let secret = SecretString::new("9e141010-token");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "9e141010-token");
    }

    #[test]
    fn test_headers_debug_hides_values() {
        let headers = AuthHeaders::new()
            .with_bearer_token("abc123")
            .with_header("X-Organization-Id", "1964");
        let debug = format!("{:?}", headers);
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("abc123"));
        assert!(!debug.contains("1964"));
    }

    #[test]
    fn test_insert_replaces_case_insensitively() {
        let headers = AuthHeaders::new()
            .with_header("authorization", "old")
            .with_bearer_token("new");
        assert_eq!(headers.len(), 1);
        let (name, value) = headers.iter().next().unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value.expose(), "Bearer new");
    }
}
