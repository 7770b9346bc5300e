// Keywarden Strategy Builder - Builds live strategies from configuration
//
// Skip policy: unknown kinds and strategies that fail to construct (missing
// env var, bad regex, empty allowlist) are dropped with a log record; the
// rest of the configuration still loads. Only a configuration that yields
// zero strategies is fatal.

use crate::config::{ConfigError, FailMode, RichConfig, StrategyConfig};
use crate::dispatcher::Rule;
use crate::strategies::{api_key, aws_sigv4::AwsSigV4Strategy, bearer, ApiKeyStrategy, BearerStrategy};
use crate::strategy::{InjectionStrategy, StrategyError};

/// Everything the dispatcher needs, built once at startup.
pub struct BuiltConfig {
    pub strategies: Vec<Box<dyn InjectionStrategy>>,
    pub rules: Vec<Rule>,
    pub fail_mode: FailMode,
    pub block_telemetry: bool,
    pub telemetry_domains: Vec<String>,
}

/// Build strategies and rules from a rich configuration document.
pub fn build(config: &RichConfig) -> Result<BuiltConfig, ConfigError> {
    let mut strategies: Vec<Box<dyn InjectionStrategy>> = Vec::new();

    for strategy_config in &config.strategies {
        match build_strategy(strategy_config) {
            Ok(Some(strategy)) => {
                tracing::info!(
                    name = %strategy.name(),
                    kind = %strategy.kind(),
                    "built strategy"
                );
                strategies.push(strategy);
            }
            Ok(None) => {
                tracing::warn!(
                    name = %strategy_config.name,
                    kind = %strategy_config.kind,
                    "unknown strategy type, skipping"
                );
            }
            Err(e) => {
                tracing::error!(
                    name = %strategy_config.name,
                    kind = %strategy_config.kind,
                    error = %e,
                    "failed to build strategy, skipping"
                );
            }
        }
    }

    if strategies.is_empty() {
        return Err(ConfigError::NoStrategies);
    }

    let mut rules = Vec::new();
    for rule_config in &config.rules {
        match Rule::compile(rule_config) {
            Ok(rule) => {
                if strategies.iter().any(|s| s.name() == rule.strategy) {
                    rules.push(rule);
                } else {
                    tracing::warn!(
                        rule = %rule.name,
                        strategy = %rule.strategy,
                        "rule references unknown strategy, skipping"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(rule = %rule_config.name, error = %e, "invalid rule, skipping");
            }
        }
    }
    // Stable sort: ties keep source order.
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));

    tracing::info!(
        strategies = strategies.len(),
        rules = rules.len(),
        fail_mode = ?config.settings.fail_mode,
        "configuration built"
    );

    Ok(BuiltConfig {
        strategies,
        rules,
        fail_mode: config.settings.fail_mode,
        block_telemetry: config.settings.block_telemetry,
        telemetry_domains: config.settings.telemetry_domains.clone(),
    })
}

/// Build a single strategy. `Ok(None)` means the kind is unknown.
fn build_strategy(
    cfg: &StrategyConfig,
) -> Result<Option<Box<dyn InjectionStrategy>>, StrategyError> {
    let name = cfg.name.as_str();
    let params = &cfg.config;
    let hosts = non_empty(&params.allowed_hosts);
    let dummy = params.dummy_pattern.as_deref();

    let strategy: Box<dyn InjectionStrategy> = match cfg.kind.as_str() {
        "bearer" => Box::new(BearerStrategy::new(
            name,
            token_source(cfg, &["token", "api_key"])?,
            required(dummy, name, "dummy_pattern")?,
            params.allowed_hosts.clone(),
        )?),
        "stripe" => Box::new(bearer::stripe(
            name,
            token_source(cfg, &["token", "api_key"])?,
            dummy,
            hosts,
        )?),
        "github" => Box::new(bearer::github(
            name,
            token_source(cfg, &["token", "api_key"])?,
            dummy,
            hosts,
        )?),
        "openai" => Box::new(bearer::openai(
            name,
            token_source(cfg, &["token", "api_key"])?,
            dummy,
            hosts,
        )?),
        "gemini" => Box::new(api_key::gemini(
            name,
            token_source(cfg, &["api_key", "token"])?,
            dummy,
            hosts,
        )?),
        "anthropic" => Box::new(api_key::anthropic(
            name,
            token_source(cfg, &["api_key", "token"])?,
            dummy,
            hosts,
        )?),
        "api_key_header" => Box::new(ApiKeyStrategy::new(
            name,
            token_source(cfg, &["api_key", "token"])?,
            params.header_name.as_deref().unwrap_or("x-api-key"),
            params.format.as_deref(),
            params.query_param_names.clone(),
            required(dummy, name, "dummy_pattern")?,
            params.allowed_hosts.clone(),
        )?),
        "aws_sigv4" => Box::new(AwsSigV4Strategy::new(
            name,
            required(params.access_key_id.as_deref(), name, "access_key_id")?,
            required(params.secret_access_key.as_deref(), name, "secret_access_key")?,
            params.session_token.as_deref(),
            params.region.clone(),
            params.service.clone(),
            hosts,
        )?),
        _ => return Ok(None),
    };

    Ok(Some(strategy))
}

fn required<'a>(
    value: Option<&'a str>,
    strategy: &str,
    key: &str,
) -> Result<&'a str, StrategyError> {
    value.ok_or_else(|| {
        StrategyError::InvalidConfig(format!("strategy '{strategy}' is missing '{key}'"))
    })
}

/// Secret field lookup in preference order; both `token` and `api_key` are
/// accepted everywhere so lifted legacy configs work for every kind.
fn token_source<'a>(cfg: &'a StrategyConfig, order: &[&str]) -> Result<&'a str, StrategyError> {
    for key in order {
        let value = match *key {
            "token" => cfg.config.token.as_deref(),
            "api_key" => cfg.config.api_key.as_deref(),
            _ => None,
        };
        if let Some(value) = value {
            return Ok(value);
        }
    }
    Err(StrategyError::InvalidConfig(format!(
        "strategy '{}' is missing '{}'",
        cfg.name, order[0]
    )))
}

fn non_empty(hosts: &[String]) -> Option<Vec<String>> {
    if hosts.is_empty() {
        None
    } else {
        Some(hosts.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuleConfig, Settings, StrategyParams};

    fn bearer_config(name: &str, token: &str) -> StrategyConfig {
        StrategyConfig {
            name: name.to_string(),
            kind: "bearer".to_string(),
            config: StrategyParams {
                token: Some(token.to_string()),
                dummy_pattern: Some("DUMMY_TEST".to_string()),
                allowed_hosts: vec!["api.example.com".to_string()],
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_build_bearer_strategy() {
        let strategy = build_strategy(&bearer_config("test", "literal-token"))
            .unwrap()
            .unwrap();
        assert_eq!(strategy.name(), "test");
        assert_eq!(strategy.kind(), "bearer");
    }

    #[test]
    fn test_unknown_kind_is_skipped_not_fatal() {
        let cfg = StrategyConfig {
            name: "weird".to_string(),
            kind: "hmac".to_string(),
            config: StrategyParams::default(),
        };
        assert!(build_strategy(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_missing_env_var_drops_only_that_strategy() {
        std::env::remove_var("KEYWARDEN_BUILDER_MISSING");
        let config = RichConfig {
            strategies: vec![
                bearer_config("good", "literal-token"),
                bearer_config("bad", "KEYWARDEN_BUILDER_MISSING"),
            ],
            rules: Vec::new(),
            settings: Settings::default(),
        };
        let built = build(&config).unwrap();
        assert_eq!(built.strategies.len(), 1);
        assert_eq!(built.strategies[0].name(), "good");
    }

    #[test]
    fn test_no_strategies_is_fatal() {
        let config = RichConfig::default();
        assert!(matches!(build(&config), Err(ConfigError::NoStrategies)));
    }

    #[test]
    fn test_empty_allowlist_rejected() {
        let mut cfg = bearer_config("test", "literal-token");
        cfg.config.allowed_hosts.clear();
        assert!(build_strategy(&cfg).is_err());
    }

    #[test]
    fn test_rules_sorted_by_priority_descending() {
        let rule = |name: &str, priority: i64| RuleConfig {
            name: name.to_string(),
            strategy: "test".to_string(),
            domain_regex: None,
            trigger_header_regex: None,
            priority,
        };
        let config = RichConfig {
            strategies: vec![bearer_config("test", "literal-token")],
            rules: vec![rule("low", 1), rule("high", 100), rule("mid-a", 50), rule("mid-b", 50)],
            settings: Settings::default(),
        };
        let built = build(&config).unwrap();
        let order: Vec<&str> = built.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(order, ["high", "mid-a", "mid-b", "low"]);
    }

    #[test]
    fn test_rule_with_unknown_strategy_is_dropped() {
        let config = RichConfig {
            strategies: vec![bearer_config("test", "literal-token")],
            rules: vec![RuleConfig {
                name: "dangling".to_string(),
                strategy: "nope".to_string(),
                domain_regex: None,
                trigger_header_regex: None,
                priority: 10,
            }],
            settings: Settings::default(),
        };
        let built = build(&config).unwrap();
        assert!(built.rules.is_empty());
    }

    #[test]
    fn test_specialized_kinds_build_with_token_only() {
        std::env::set_var("KEYWARDEN_BUILDER_PRESET", "real-value");
        for kind in ["openai", "github", "stripe", "gemini", "anthropic"] {
            let cfg = StrategyConfig {
                name: format!("preset-{kind}"),
                kind: kind.to_string(),
                config: StrategyParams {
                    token: Some("KEYWARDEN_BUILDER_PRESET".to_string()),
                    ..Default::default()
                },
            };
            let strategy = build_strategy(&cfg).unwrap().unwrap();
            assert_eq!(strategy.kind(), kind);
        }
        std::env::remove_var("KEYWARDEN_BUILDER_PRESET");
    }
}
