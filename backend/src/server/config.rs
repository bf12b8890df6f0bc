//! Application configuration loaded via OrthoConfig.
//!
//! Every value can come from the environment (prefix `PORTFOLIO`), a config
//! file, or CLI flags. Only the store URI is mandatory; everything else has
//! a workable default.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::AdminRoster;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE: &str = "portfolio";
const DEFAULT_IDENTITY_SEARCH_URL: &str = "https://api.github.com/search/users";
const DEFAULT_STORE_IDLE_SECS: u64 = 300;
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ENRICHMENT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_ENRICHMENT_BACKOFF_MS: u64 = 500;

/// Configuration values for the portfolio backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PORTFOLIO")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Document store connection URI (required).
    pub mongo_uri: Option<String>,
    /// Document store database name.
    pub mongo_database: Option<String>,
    /// Inactivity window before the store connection is reaped, in seconds.
    pub store_idle_secs: Option<u64>,
    /// Comma-separated admin email allow-list.
    pub admin_emails: Option<String>,
    /// Token introspection endpoint on the identity provider.
    pub token_verify_url: Option<String>,
    /// Expected primary token audience.
    pub token_audience: Option<String>,
    /// Identity search endpoint used for enrichment.
    pub identity_search_url: Option<String>,
    /// Optional identity search API token for higher rate limits.
    pub identity_search_token: Option<String>,
    /// Timeout applied to every outbound identity call, in seconds.
    pub outbound_timeout_secs: Option<u64>,
    /// Identity-search attempts per new user (including the first).
    pub enrichment_max_attempts: Option<u32>,
    /// Delay between identity-search attempts, in milliseconds.
    pub enrichment_backoff_ms: Option<u64>,
}

impl AppSettings {
    /// Bind address, falling back to the default.
    pub fn bind_addr(&self) -> &str {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR)
    }

    /// Database name, falling back to the default.
    pub fn mongo_database(&self) -> &str {
        self.mongo_database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    /// Store idle window before the reaper disconnects.
    pub fn store_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.store_idle_secs.unwrap_or(DEFAULT_STORE_IDLE_SECS))
    }

    /// Configured admin identities.
    pub fn admin_roster(&self) -> AdminRoster {
        AdminRoster::new(
            self.admin_emails
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::to_owned),
        )
    }

    /// Identity search endpoint, falling back to the default.
    pub fn identity_search_url(&self) -> &str {
        self.identity_search_url
            .as_deref()
            .unwrap_or(DEFAULT_IDENTITY_SEARCH_URL)
    }

    /// Timeout for every outbound identity call.
    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(
            self.outbound_timeout_secs
                .unwrap_or(DEFAULT_OUTBOUND_TIMEOUT_SECS),
        )
    }

    /// Enrichment retry bound (including the first attempt).
    pub fn enrichment_max_attempts(&self) -> u32 {
        self.enrichment_max_attempts
            .unwrap_or(DEFAULT_ENRICHMENT_MAX_ATTEMPTS)
    }

    /// Delay between enrichment attempts.
    pub fn enrichment_backoff(&self) -> Duration {
        Duration::from_millis(
            self.enrichment_backoff_ms
                .unwrap_or(DEFAULT_ENRICHMENT_BACKOFF_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.
    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("portfolio-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env([
            ("PORTFOLIO_BIND_ADDR", None::<String>),
            ("PORTFOLIO_MONGO_URI", None::<String>),
            ("PORTFOLIO_MONGO_DATABASE", None::<String>),
            ("PORTFOLIO_ADMIN_EMAILS", None::<String>),
            ("PORTFOLIO_STORE_IDLE_SECS", None::<String>),
            ("PORTFOLIO_OUTBOUND_TIMEOUT_SECS", None::<String>),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(settings.mongo_database(), DEFAULT_DATABASE);
        assert!(settings.mongo_uri.is_none());
        assert!(settings.admin_roster().is_empty());
        assert_eq!(settings.store_idle_timeout(), Duration::from_secs(300));
        assert_eq!(settings.outbound_timeout(), Duration::from_secs(10));
        assert_eq!(settings.enrichment_max_attempts(), 2);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("PORTFOLIO_BIND_ADDR", Some("127.0.0.1:9999".to_owned())),
            (
                "PORTFOLIO_MONGO_URI",
                Some("mongodb://localhost:27017".to_owned()),
            ),
            ("PORTFOLIO_MONGO_DATABASE", Some("portfolio_test".to_owned())),
            (
                "PORTFOLIO_ADMIN_EMAILS",
                Some("owner@example.com, second@example.com".to_owned()),
            ),
            ("PORTFOLIO_STORE_IDLE_SECS", Some("30".to_owned())),
            ("PORTFOLIO_OUTBOUND_TIMEOUT_SECS", Some("3".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr(), "127.0.0.1:9999");
        assert_eq!(settings.mongo_uri.as_deref(), Some("mongodb://localhost:27017"));
        assert_eq!(settings.mongo_database(), "portfolio_test");
        assert!(!settings.admin_roster().is_empty());
        assert_eq!(settings.store_idle_timeout(), Duration::from_secs(30));
        assert_eq!(settings.outbound_timeout(), Duration::from_secs(3));
    }

    #[rstest]
    fn admin_roster_splits_and_matches_case_insensitively() {
        let _guard = lock_env([(
            "PORTFOLIO_ADMIN_EMAILS",
            Some("Owner@Example.com,second@example.com".to_owned()),
        )]);

        let roster = load_from_empty_args().admin_roster();
        let owner = crate::domain::EmailAddress::new("owner@example.COM").expect("valid email");
        assert!(roster.contains(&owner));
    }
}
