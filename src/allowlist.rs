// Keywarden Authorization Gate - Host allowlist matching
//
// Patterns are never regex: dots are literal, matching is ASCII case-folded,
// and no Unicode or punycode normalization is applied, so a homograph host
// can never equal an ASCII allowlist entry.

/// Check a destination host against a list of allowed host patterns.
///
/// Pattern forms:
/// - exact: `api.openai.com` matches only that host
/// - wildcard: `*.amazonaws.com` matches the bare domain and any subdomain
/// - bare domain: `github.com` matches the domain and any subdomain
///
/// An empty list denies every host.
pub fn host_allowed(host: &str, patterns: &[String]) -> bool {
    let host = host.to_ascii_lowercase();

    for pattern in patterns {
        let pattern = pattern.to_ascii_lowercase();

        if host == pattern {
            return true;
        }

        if let Some(domain) = pattern.strip_prefix("*.") {
            if host == domain || host.ends_with(&format!(".{domain}")) {
                return true;
            }
            continue;
        }

        if host.ends_with(&format!(".{pattern}")) {
            return true;
        }
    }

    false
}

/// Check a host against the telemetry blocklist. Same pattern semantics as
/// [`host_allowed`]; subdomains of every listed domain match implicitly.
pub fn is_telemetry_host(host: &str, domains: &[String]) -> bool {
    host_allowed(host, domains)
}
