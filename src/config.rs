use std::path::PathBuf;

use anyhow::{bail, Context};

use crate::models::ListingStatus;
use crate::rate_limit::RateLimitConfig;

const MIN_SECRET_LEN: usize = 32;

/// Emails allowed to self-promote to admin. Matching is trimmed and case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowlist(Vec<String>);

impl AdminAllowlist {
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        !email.is_empty() && self.0.iter().any(|e| *e == email)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingSourceKind {
    #[default]
    Store,
    Fixture,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub admin_emails: AdminAllowlist,
    pub bind_addr: String,
    pub listing_source: ListingSourceKind,
    pub data_dir: Option<PathBuf>,
    pub initial_listing_status: ListingStatus,
    pub allow_seed: bool,
    pub frontend_url: String,
    pub enable_hsts: bool,
    /// Take the client address from `Forwarded`/`X-Forwarded-For`; only behind a trusted proxy.
    pub trust_proxy: bool,
    pub rate_limit_enabled: bool,
    pub rate_limits: RateLimitConfig,
}

impl Default for AppConfig {
    /// Local/test defaults: ephemeral store, seeding on, rate limiting off.
    fn default() -> Self {
        Self {
            jwt_secret: "local-development-secret-0123456789abcdef".into(),
            admin_emails: AdminAllowlist::default(),
            bind_addr: "0.0.0.0:8080".into(),
            listing_source: ListingSourceKind::Store,
            data_dir: None,
            initial_listing_status: ListingStatus::Pending,
            allow_seed: true,
            frontend_url: "http://localhost:5173".into(),
            enable_hsts: false,
            trust_proxy: false,
            rate_limit_enabled: false,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

fn flag(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup, so tests need not touch the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }

        let listing_source = match get("LISTING_SOURCE").as_deref().map(str::trim) {
            None | Some("") | Some("store") => ListingSourceKind::Store,
            Some("fixture") => ListingSourceKind::Fixture,
            Some(other) => bail!("LISTING_SOURCE must be 'store' or 'fixture', got '{other}'"),
        };

        let initial_listing_status = match get("INITIAL_LISTING_STATUS").as_deref().map(str::trim) {
            None | Some("") | Some("pending") => ListingStatus::Pending,
            Some("active") => ListingStatus::Active,
            Some(other) => bail!("INITIAL_LISTING_STATUS must be 'pending' or 'active', got '{other}'"),
        };

        let rate_limits = RateLimitConfig::from_lookup(&get)?;

        Ok(Self {
            jwt_secret,
            admin_emails: AdminAllowlist::parse(&get("ADMIN_EMAILS").unwrap_or_default()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            listing_source,
            data_dir: get("DATA_DIR").filter(|d| !d.trim().is_empty()).map(PathBuf::from),
            initial_listing_status,
            allow_seed: get("ALLOW_SEED").map(|v| flag(&v)).unwrap_or(cfg!(debug_assertions)),
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:5173".into()),
            enable_hsts: get("ENABLE_HSTS").map(|v| flag(&v)).unwrap_or(false),
            trust_proxy: get("TRUST_PROXY").map(|v| flag(&v)).unwrap_or(false),
            rate_limit_enabled: get("RATE_LIMIT_ENABLED").map(|v| flag(&v)).unwrap_or(true),
            rate_limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn secret_is_required_and_long_enough() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("JWT_SECRET", "short")])).is_err());
        let cfg = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(cfg.listing_source, ListingSourceKind::Store);
        assert_eq!(cfg.initial_listing_status, ListingStatus::Pending);
        assert!(cfg.rate_limit_enabled);
        assert_eq!(cfg.rate_limits.listing_limit, 5);
    }

    #[test]
    fn parses_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("LISTING_SOURCE", "fixture"),
            ("INITIAL_LISTING_STATUS", "active"),
            ("ALLOW_SEED", "false"),
            ("DATA_DIR", "/tmp/oghep"),
            ("RL_REPORT_LIMIT", "2"),
            ("RL_REPORT_WINDOW", "60"),
            ("TRUST_PROXY", "true"),
        ]))
        .unwrap();
        assert!(cfg.trust_proxy);
        assert_eq!(cfg.listing_source, ListingSourceKind::Fixture);
        assert_eq!(cfg.initial_listing_status, ListingStatus::Active);
        assert!(!cfg.allow_seed);
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/oghep")));
        assert_eq!(cfg.rate_limits.report_limit, 2);
        assert_eq!(cfg.rate_limits.report_window, Duration::from_secs(60));

        let bad = AppConfig::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("LISTING_SOURCE", "sql")]));
        assert!(bad.is_err());
    }

    #[test]
    fn allowlist_matching_is_trimmed_and_case_insensitive() {
        let list = AdminAllowlist::parse(" Admin@OGhep.vn , ,ops@oghep.vn");
        assert_eq!(list.len(), 2);
        assert!(list.contains("admin@oghep.vn"));
        assert!(list.contains("  OPS@oghep.VN "));
        assert!(!list.contains("someone@oghep.vn"));
        assert!(!list.contains(""));
    }
}
