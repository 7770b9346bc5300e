// Keywarden Strategy Contract - Pluggable credential-injection strategies

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::flow::Flow;

/// Strategy failure taxonomy.
///
/// `InvalidConfig` and `SecretMissing` can surface at construction time;
/// everything else is a request-time failure. The dispatcher is the only
/// place these are converted into wire responses.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("host {host} not whitelisted for {strategy}")]
    HostNotAllowed { host: String, strategy: String },

    #[error("{name} not configured")]
    SecretMissing { name: String },

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("invalid strategy configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Internal(String),
}

/// Credential-injection strategy.
///
/// Each strategy implements one authentication protocol:
/// - Bearer tokens (OpenAI, Anthropic, GitHub, Stripe, etc.)
/// - API-key headers and query parameters (Gemini, Anthropic)
/// - AWS Signature Version 4
pub trait InjectionStrategy: Send + Sync + fmt::Debug {
    /// Strategy name, unique per configuration.
    fn name(&self) -> &str;

    /// Strategy kind (bearer, gemini, aws_sigv4, ...).
    fn kind(&self) -> &str;

    /// Pure inspection: does this request carry this strategy's dummy
    /// credential? Must not mutate the flow.
    fn detect(&self, flow: &Flow) -> bool;

    /// Replace the dummy credential with the real one.
    ///
    /// Implementations must authorize the destination host against their
    /// allowlist before writing any secret into the flow, and must never
    /// log the real secret value.
    fn inject(&self, flow: &mut Flow) -> Result<(), StrategyError>;
}

/// Resolved secret material. Zeroed on drop; `Debug` never shows the value.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Where a secret comes from: a literal config value, or an environment
/// variable named by the config value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    Literal(String),
    Env(String),
}

impl SecretSource {
    /// A raw value that is ASCII uppercase-with-underscores (at least one
    /// letter, no lowercase, at least one `_`) names an environment
    /// variable; anything else is a literal secret.
    pub fn parse(raw: &str) -> Self {
        let has_letter = raw.chars().any(|c| c.is_ascii_uppercase());
        let no_lowercase = !raw.chars().any(|c| c.is_ascii_lowercase());
        if has_letter && no_lowercase && raw.contains('_') {
            SecretSource::Env(raw.to_string())
        } else {
            SecretSource::Literal(raw.to_string())
        }
    }

    /// Resolve to secret material. Env references that are unset or empty
    /// fail with `SecretMissing`; resolution happens once, at strategy
    /// construction.
    pub fn resolve(&self) -> Result<Secret, StrategyError> {
        match self {
            SecretSource::Literal(value) => Ok(Secret::new(value.clone())),
            SecretSource::Env(name) => match std::env::var(name) {
                Ok(value) if !value.is_empty() => Ok(Secret::new(value)),
                _ => Err(StrategyError::SecretMissing { name: name.clone() }),
            },
        }
    }
}

/// Parse-and-resolve shorthand used by strategy constructors.
pub fn resolve_secret(raw: &str) -> Result<Secret, StrategyError> {
    SecretSource::parse(raw).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_source_parsing() {
        assert_eq!(
            SecretSource::parse("REAL_OPENAI_API_KEY"),
            SecretSource::Env("REAL_OPENAI_API_KEY".to_string())
        );
        assert_eq!(
            SecretSource::parse("MY_TOKEN_2"),
            SecretSource::Env("MY_TOKEN_2".to_string())
        );
        // Literals: lowercase, no underscore, or no letters at all.
        assert_eq!(
            SecretSource::parse("sk-proj-abc123"),
            SecretSource::Literal("sk-proj-abc123".to_string())
        );
        assert_eq!(
            SecretSource::parse("UPPERCASE"),
            SecretSource::Literal("UPPERCASE".to_string())
        );
        assert_eq!(
            SecretSource::parse("1234_5678"),
            SecretSource::Literal("1234_5678".to_string())
        );
    }

    #[test]
    fn test_resolve_literal() {
        let secret = resolve_secret("sk-live-value").unwrap();
        assert_eq!(secret.expose(), "sk-live-value");
    }

    #[test]
    fn test_resolve_env() {
        std::env::set_var("KEYWARDEN_TEST_SECRET", "resolved-value");
        let secret = resolve_secret("KEYWARDEN_TEST_SECRET").unwrap();
        assert_eq!(secret.expose(), "resolved-value");
        std::env::remove_var("KEYWARDEN_TEST_SECRET");
    }

    #[test]
    fn test_resolve_missing_env() {
        std::env::remove_var("KEYWARDEN_MISSING_SECRET");
        let err = resolve_secret("KEYWARDEN_MISSING_SECRET").unwrap_err();
        match err {
            StrategyError::SecretMissing { name } => {
                assert_eq!(name, "KEYWARDEN_MISSING_SECRET")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("super-secret");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
    }
}
