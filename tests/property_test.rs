// Property-based tests for the authorization gate.
// Uses proptest for generative testing

use keywarden_proxy::allowlist::host_allowed;
use proptest::prelude::*;

fn label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,9}"
}

fn domain() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 2..4).prop_map(|labels| labels.join("."))
}

proptest! {
    #[test]
    fn exact_pattern_matches_itself(host in domain()) {
        prop_assert!(host_allowed(&host, &[host.clone()]));
    }

    #[test]
    fn matching_is_case_insensitive(host in domain()) {
        prop_assert!(host_allowed(&host.to_uppercase(), &[host.clone()]));
        prop_assert!(host_allowed(&host, &[host.to_uppercase()]));
    }

    #[test]
    fn wildcard_matches_any_subdomain(sub in label(), base in domain()) {
        let pattern = format!("*.{base}");
        let subdomain = format!("{}.{}", sub, base);
        prop_assert!(host_allowed(&subdomain, &[pattern.clone()]));
        prop_assert!(host_allowed(&base, &[pattern]));
    }

    #[test]
    fn bare_domain_matches_subdomains(sub in label(), base in domain()) {
        let subdomain = format!("{}.{}", sub, base);
        prop_assert!(host_allowed(&subdomain, &[base.clone()]));
    }

    #[test]
    fn suffix_spoof_never_matches(
        base in prop::collection::vec("[a-c]{1,6}", 2..4).prop_map(|l| l.join(".")),
        evil in prop::collection::vec("[x-z]{1,6}", 2..4).prop_map(|l| l.join(".")),
    ) {
        // <allowed-domain>.<attacker-domain> must be denied for exact,
        // wildcard, and bare patterns alike. Disjoint alphabets keep the
        // spoofed host from accidentally being a real subdomain of base.
        let spoofed = format!("{base}.{evil}");
        let wildcard_pattern = format!("*.{}", base);
        prop_assert!(!host_allowed(&spoofed, &[base.clone()]));
        prop_assert!(!host_allowed(&spoofed, &[wildcard_pattern]));
    }

    #[test]
    fn empty_allowlist_denies_everything(host in domain()) {
        prop_assert!(!host_allowed(&host, &[]));
    }

    #[test]
    fn unrelated_domains_never_match(host in domain(), pattern in domain()) {
        prop_assume!(host != pattern);
        prop_assume!(!host.ends_with(&format!(".{pattern}")));
        prop_assert!(!host_allowed(&host, &[pattern.clone()]));
    }
}
