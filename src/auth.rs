//! Token sourcing for authenticated connections.

use secrecy::SecretString;

/// Environment variable read by [`EnvTokenProvider::default`].
pub const AUTH_TOKEN_ENV: &str = "WORKLANE_AUTH_TOKEN";

/// Source of the bearer token consumed at connect time.
///
/// Implementations return `None` when no token is available (for example, a
/// signed-out user); callers treat that as "do not connect".
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<SecretString>;
}

/// Provider holding a fixed token.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

impl TokenProvider for StaticTokenProvider {
    fn token(&self) -> Option<SecretString> {
        Some(self.token.clone())
    }
}

/// Provider reading the token from an environment variable on every call.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvTokenProvider {
    fn default() -> Self {
        Self::new(AUTH_TOKEN_ENV)
    }
}

impl TokenProvider for EnvTokenProvider {
    fn token(&self) -> Option<SecretString> {
        std::env::var(&self.var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::new)
    }
}
