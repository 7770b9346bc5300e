// Keywarden Configuration - Declarative strategy and routing configuration
//
// Three tiers, first usable source wins:
//   1. rich config.yaml (strategies + rules + settings)
//   2. legacy credentials.yml (flat credential list, lifted to strategies)
//   3. hardcoded fallback presets
// A present-but-malformed higher tier falls through with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Overrides the rich config location.
pub const CONFIG_PATH_ENV: &str = "CREDENTIAL_CONFIG_PATH";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no usable strategies were configured")]
    NoStrategies,
}

/// Global fail-mode policy: whether injection failures block the request
/// or let it pass upstream with its dummy credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    #[default]
    Closed,
    Open,
}

/// Rich configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichConfig {
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[serde(default)]
    pub settings: Settings,
}

/// One declared strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,

    /// Strategy kind: bearer, stripe, github, openai, gemini, anthropic,
    /// api_key_header, aws_sigv4.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub config: StrategyParams,
}

/// Kind-specific strategy parameters. Secret-bearing fields hold either a
/// literal value or an all-uppercase environment-variable name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dummy_pattern: Option<String>,

    #[serde(default)]
    pub allowed_hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,

    /// Value template; the literal `{token}` placeholder is replaced with
    /// the real secret. No other interpolation exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default)]
    pub query_param_names: Vec<String>,
}

/// Declarative routing rule mapping requests to a strategy by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,

    pub strategy: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_regex: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_header_regex: Option<String>,

    #[serde(default)]
    pub priority: i64,
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub fail_mode: FailMode,

    #[serde(default = "default_true")]
    pub block_telemetry: bool,

    #[serde(default = "default_telemetry_domains")]
    pub telemetry_domains: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fail_mode: FailMode::Closed,
            block_telemetry: true,
            telemetry_domains: default_telemetry_domains(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_telemetry_domains() -> Vec<String> {
    [
        "telemetry.anthropic.com",
        "sentry.io",
        "*.sentry.io",
        "segment.com",
        "*.segment.com",
        "mixpanel.com",
        "*.mixpanel.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Legacy credentials.yml document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyConfig {
    #[serde(default)]
    pub credentials: BTreeMap<String, LegacyCredential>,

    #[serde(default)]
    pub security: LegacySecurity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyCredential {
    pub dummy_token: String,
    pub env_var: String,
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub header_locations: Vec<String>,
    #[serde(default)]
    pub query_param_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySecurity {
    #[serde(default)]
    pub telemetry_blocklist: Vec<String>,
    /// Parsed for compatibility; reserved, no observable effect.
    #[serde(default)]
    pub unknown_host_policy: Option<String>,
    #[serde(default)]
    pub verbose_logging: bool,
}

/// Load configuration, walking the tiers. Never fails; the hardcoded
/// fallback is the floor.
pub fn load() -> RichConfig {
    let mut rich_paths: Vec<PathBuf> = Vec::new();
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        rich_paths.push(PathBuf::from(path));
    }
    rich_paths.push(PathBuf::from("config.yaml"));
    rich_paths.push(PathBuf::from("/app/config.yaml"));

    for path in &rich_paths {
        if path.exists() {
            match load_rich(path) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded rich configuration");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping rich config")
                }
            }
        }
    }

    for path in [Path::new("credentials.yml"), Path::new("/app/credentials.yml")] {
        if path.exists() {
            match load_legacy(path) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded legacy configuration");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping legacy config")
                }
            }
        }
    }

    tracing::warn!("no configuration file found, using hardcoded fallback");
    fallback()
}

/// Parse a rich config.yaml document.
pub fn load_rich(path: &Path) -> Result<RichConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a legacy credentials.yml document and lift it to rich form.
pub fn load_legacy(path: &Path) -> Result<RichConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let legacy: LegacyConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(lift_legacy(legacy))
}

/// Lift a legacy credential list into rich strategies. Entries that name
/// header locations or query parameters become api-key strategies; the
/// rest become bearer strategies.
pub fn lift_legacy(legacy: LegacyConfig) -> RichConfig {
    let mut strategies = Vec::new();

    for (service, cred) in legacy.credentials {
        let uses_api_key =
            !cred.header_locations.is_empty() || !cred.query_param_names.is_empty();
        let kind = if uses_api_key { "api_key_header" } else { "bearer" };

        strategies.push(StrategyConfig {
            name: format!("legacy-{service}"),
            kind: kind.to_string(),
            config: StrategyParams {
                token: Some(cred.env_var),
                dummy_pattern: Some(cred.dummy_token),
                allowed_hosts: cred.allowed_hosts,
                header_name: cred.header_locations.into_iter().next(),
                query_param_names: cred.query_param_names,
                ..Default::default()
            },
        });
    }

    let telemetry_domains = if legacy.security.telemetry_blocklist.is_empty() {
        default_telemetry_domains()
    } else {
        legacy.security.telemetry_blocklist
    };

    RichConfig {
        strategies,
        rules: Vec::new(),
        settings: Settings {
            fail_mode: FailMode::Closed,
            block_telemetry: true,
            telemetry_domains,
        },
    }
}

/// Hardcoded fallback presets. Strategies whose environment variables are
/// unset get dropped at build time like any other.
pub fn fallback() -> RichConfig {
    let preset = |name: &str, kind: &str, token: &str| StrategyConfig {
        name: name.to_string(),
        kind: kind.to_string(),
        config: StrategyParams {
            token: Some(token.to_string()),
            ..Default::default()
        },
    };

    let aws = StrategyConfig {
        name: "fallback-aws".to_string(),
        kind: "aws_sigv4".to_string(),
        config: StrategyParams {
            access_key_id: Some("REAL_AWS_ACCESS_KEY_ID".to_string()),
            secret_access_key: Some("REAL_AWS_SECRET_ACCESS_KEY".to_string()),
            session_token: Some("REAL_AWS_SESSION_TOKEN".to_string()),
            region: Some("us-east-1".to_string()),
            ..Default::default()
        },
    };

    RichConfig {
        strategies: vec![
            preset("fallback-openai", "openai", "REAL_OPENAI_API_KEY"),
            preset("fallback-github", "github", "REAL_GITHUB_TOKEN"),
            preset("fallback-anthropic", "anthropic", "REAL_ANTHROPIC_API_KEY"),
            aws,
        ],
        rules: Vec::new(),
        settings: Settings::default(),
    }
}
