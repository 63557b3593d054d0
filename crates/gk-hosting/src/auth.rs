//! Credentials for the hosting API

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

const REDACTED: &str = "[REDACTED]";

/// An access token. Never printed: `Debug` and `Display` show a placeholder.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building authenticated requests only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Username and token used for basic authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    token: SecretToken,
}

impl Credentials {
    pub fn new(username: impl Into<String>, token: SecretToken) -> Self {
        Self {
            username: username.into(),
            token,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &SecretToken {
        &self.token
    }

    /// Value for the `Authorization` header
    pub fn basic_auth_header(&self) -> String {
        let pair = format!("{}:{}", self.username, self.token.expose());
        format!("Basic {}", STANDARD.encode(pair))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted() {
        let token = SecretToken::new("ghp_supersecret");
        assert_eq!(format!("{:?}", token), "[REDACTED]");
        assert_eq!(token.to_string(), "[REDACTED]");
        assert_eq!(token.expose(), "ghp_supersecret");

        let credentials = Credentials::new("alice", token);
        assert!(!format!("{:?}", credentials).contains("supersecret"));
    }

    #[test]
    fn test_basic_auth_header() {
        let credentials = Credentials::new("alice", SecretToken::new("token"));
        // base64("alice:token")
        assert_eq!(credentials.basic_auth_header(), "Basic YWxpY2U6dG9rZW4=");
    }
}
