// SPDX-License-Identifier: BUSL-1.1
//! # Provider Filter
//!
//! Services can be scoped to a subset of content providers. When the
//! `included` list is non-empty it is the only list consulted: providers on
//! it are processed, all others are ignored. `excluded` is checked only when
//! `included` is empty.

use serde::{Deserialize, Serialize};

/// Include/exclude filter over content provider identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFilter {
    /// Providers to process. Non-empty means "only these".
    #[serde(default)]
    pub included: Vec<String>,
    /// Providers to skip. Consulted only when `included` is empty.
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl ProviderFilter {
    /// Filter that processes every provider.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Whether a message from `provider` should be ignored.
    pub fn is_ignored(&self, provider: &str) -> bool {
        if !self.included.is_empty() {
            return !self.included.iter().any(|p| p == provider);
        }
        self.excluded.iter().any(|p| p == provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDER: &str = "acme-music";

    fn filter(included: &[&str], excluded: &[&str]) -> ProviderFilter {
        ProviderFilter {
            included: included.iter().map(|s| s.to_string()).collect(),
            excluded: excluded.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_lists_ignore_nothing() {
        assert!(!filter(&[], &[]).is_ignored(PROVIDER));
    }

    #[test]
    fn excluded_provider_is_ignored() {
        assert!(filter(&[], &[PROVIDER]).is_ignored(PROVIDER));
    }

    #[test]
    fn other_excluded_providers_do_not_match() {
        assert!(!filter(&[], &["someone-else"]).is_ignored(PROVIDER));
    }

    #[test]
    fn included_provider_is_processed() {
        assert!(!filter(&[PROVIDER], &[]).is_ignored(PROVIDER));
    }

    #[test]
    fn provider_outside_included_list_is_ignored() {
        assert!(filter(&["someone-else"], &[]).is_ignored(PROVIDER));
    }

    #[test]
    fn included_wins_over_excluded() {
        // A non-empty included list is the only list consulted.
        assert!(!filter(&[PROVIDER], &[PROVIDER]).is_ignored(PROVIDER));
    }
}
