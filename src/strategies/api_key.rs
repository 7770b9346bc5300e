// API-Key Strategy
// Handles header- and query-parameter API keys (Gemini, Anthropic, generic)

use axum::http::{HeaderName, HeaderValue};
use regex::Regex;

use crate::allowlist;
use crate::flow::Flow;
use crate::strategy::{resolve_secret, InjectionStrategy, Secret, StrategyError};

/// API-key strategy.
///
/// Detects the dummy key in a configured header or in one of the configured
/// query parameters. Injection tries the header first and stops there when
/// it carried the dummy; the query parameter is only rewritten when the
/// header did not match. When the dummy is a proper substring of the value,
/// only the matched span is replaced; when it is the whole value, the whole
/// value is replaced.
#[derive(Debug)]
pub struct ApiKeyStrategy {
    name: String,
    kind: &'static str,
    api_key: Secret,
    header_name: HeaderName,
    format: String,
    query_param_names: Vec<String>,
    dummy_pattern: Regex,
    allowed_hosts: Vec<String>,
}

impl ApiKeyStrategy {
    pub fn new(
        name: &str,
        api_key_source: &str,
        header_name: &str,
        format: Option<&str>,
        query_param_names: Vec<String>,
        dummy_pattern: &str,
        allowed_hosts: Vec<String>,
    ) -> Result<Self, StrategyError> {
        if allowed_hosts.is_empty() {
            return Err(StrategyError::InvalidConfig(format!(
                "api-key strategy '{name}' requires a non-empty allowed_hosts list"
            )));
        }

        let format = format.unwrap_or("{token}").to_string();
        if !format.contains("{token}") {
            return Err(StrategyError::InvalidConfig(format!(
                "api-key strategy '{name}' format must contain the {{token}} placeholder"
            )));
        }

        let header_name = HeaderName::try_from(header_name).map_err(|e| {
            StrategyError::InvalidConfig(format!(
                "api-key strategy '{name}' has invalid header_name: {e}"
            ))
        })?;

        let dummy_pattern = Regex::new(dummy_pattern).map_err(|e| {
            StrategyError::InvalidConfig(format!(
                "api-key strategy '{name}' has invalid dummy_pattern: {e}"
            ))
        })?;

        Ok(Self {
            name: name.to_string(),
            kind: "api_key_header",
            api_key: resolve_secret(api_key_source)?,
            header_name,
            format,
            query_param_names,
            dummy_pattern,
            allowed_hosts,
        })
    }

    fn formatted_token(&self) -> String {
        self.format.replace("{token}", self.api_key.expose())
    }

    /// Replace the dummy span inside `value` with the formatted real token.
    fn splice(&self, value: &str) -> Option<String> {
        let found = self.dummy_pattern.find(value)?;
        let mut out = String::with_capacity(value.len());
        out.push_str(&value[..found.start()]);
        out.push_str(&self.formatted_token());
        out.push_str(&value[found.end()..]);
        Some(out)
    }
}

impl InjectionStrategy for ApiKeyStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        self.kind
    }

    fn detect(&self, flow: &Flow) -> bool {
        if let Some(value) = flow.header(self.header_name.as_str()) {
            if self.dummy_pattern.is_match(value) {
                tracing::debug!(
                    strategy = %self.name,
                    host = %flow.host(),
                    header = %self.header_name,
                    "detected dummy api key in header"
                );
                return true;
            }
        }

        for param in &self.query_param_names {
            if let Some(value) = flow.query_value(param) {
                if self.dummy_pattern.is_match(value) {
                    tracing::debug!(
                        strategy = %self.name,
                        host = %flow.host(),
                        param = %param,
                        "detected dummy api key in query parameter"
                    );
                    return true;
                }
            }
        }

        false
    }

    fn inject(&self, flow: &mut Flow) -> Result<(), StrategyError> {
        if !allowlist::host_allowed(flow.host(), &self.allowed_hosts) {
            return Err(StrategyError::HostNotAllowed {
                host: flow.host().to_string(),
                strategy: self.name.clone(),
            });
        }

        // Header wins over query when both carry the dummy.
        if let Some(value) = flow.header(self.header_name.as_str()) {
            if let Some(replaced) = self.splice(value) {
                let value = HeaderValue::from_str(&replaced).map_err(|e| {
                    StrategyError::Internal(format!("invalid api-key header value: {e}"))
                })?;
                flow.headers_mut().insert(self.header_name.clone(), value);
                tracing::info!(
                    strategy = %self.name,
                    method = %flow.method(),
                    host = %flow.host(),
                    path = %flow.path(),
                    "injected api key into header"
                );
                return Ok(());
            }
        }

        for param in &self.query_param_names {
            let replaced = flow.query_value(param).and_then(|v| self.splice(v));
            if let Some(replaced) = replaced {
                flow.set_query_value(param, &replaced);
                tracing::info!(
                    strategy = %self.name,
                    method = %flow.method(),
                    host = %flow.host(),
                    path = %flow.path(),
                    param = %param,
                    "injected api key into query parameter"
                );
                return Ok(());
            }
        }

        tracing::warn!(
            strategy = %self.name,
            host = %flow.host(),
            "strategy selected but no dummy api key found to replace"
        );
        Ok(())
    }
}

/// Gemini preset: x-goog-api-key header plus the `key` query parameter.
pub fn gemini(
    name: &str,
    api_key_source: &str,
    dummy_pattern: Option<&str>,
    allowed_hosts: Option<Vec<String>>,
) -> Result<ApiKeyStrategy, StrategyError> {
    let mut strategy = ApiKeyStrategy::new(
        name,
        api_key_source,
        "x-goog-api-key",
        None,
        vec!["key".to_string()],
        dummy_pattern.unwrap_or(r"(DUMMY_GEMINI_KEY|AIza[a-zA-Z0-9_-]{35}DUMMY)"),
        allowed_hosts.unwrap_or_else(|| {
            vec![
                "generativelanguage.googleapis.com".to_string(),
                "*.googleapis.com".to_string(),
            ]
        }),
    )?;
    strategy.kind = "gemini";
    Ok(strategy)
}

/// Anthropic preset: x-api-key header.
pub fn anthropic(
    name: &str,
    api_key_source: &str,
    dummy_pattern: Option<&str>,
    allowed_hosts: Option<Vec<String>>,
) -> Result<ApiKeyStrategy, StrategyError> {
    let mut strategy = ApiKeyStrategy::new(
        name,
        api_key_source,
        "x-api-key",
        None,
        Vec::new(),
        dummy_pattern.unwrap_or(r"(DUMMY_ANTHROPIC_KEY|sk-ant-[a-zA-Z0-9_-]{24,}DUMMY)"),
        allowed_hosts.unwrap_or_else(|| vec!["api.anthropic.com".to_string()]),
    )?;
    strategy.kind = "anthropic";
    Ok(strategy)
}
