use secrecy::SecretString;

/// Source of the bearer token attached to every request.
///
/// The client asks on each request instead of caching, so a token set or
/// cleared by the session layer applies to the very next call.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<SecretString>;
}

/// Anonymous access: no `Authorization` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn bearer_token(&self) -> Option<SecretString> {
        None
    }
}

/// A fixed token, for scripts and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(pub SecretString);

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}
