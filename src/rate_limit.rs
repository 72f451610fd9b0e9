use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use dashmap::DashMap;

/// Throttled actions; each has its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateListing,
    FileReport,
}

/// Per-action limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub listing_limit: usize,
    pub listing_window: Duration,
    pub report_limit: usize,
    pub report_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            listing_limit: 5,
            listing_window: Duration::from_secs(3600),
            report_limit: 10,
            report_window: Duration::from_secs(3600),
        }
    }
}

impl RateLimitConfig {
    pub fn from_lookup<F>(get: &F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let num = |name: &str, default: u64| -> anyhow::Result<u64> {
            match get(name) {
                Some(v) => v.trim().parse().with_context(|| format!("{name} must be a non-negative integer")),
                None => Ok(default),
            }
        };
        let d = Self::default();
        Ok(Self {
            listing_limit: num("RL_LISTING_LIMIT", d.listing_limit as u64)? as usize,
            listing_window: Duration::from_secs(num("RL_LISTING_WINDOW", d.listing_window.as_secs())?),
            report_limit: num("RL_REPORT_LIMIT", d.report_limit as u64)? as usize,
            report_window: Duration::from_secs(num("RL_REPORT_WINDOW", d.report_window.as_secs())?),
        })
    }

    fn budget(&self, action: Action) -> (usize, Duration) {
        match action {
            Action::CreateListing => (self.listing_limit, self.listing_window),
            Action::FileReport => (self.report_limit, self.report_window),
        }
    }
}

/// Attempts between sweeps of idle subjects.
const SWEEP_EVERY: usize = 1024;

/// Process-local sliding-window limiter keyed by action and subject.
#[derive(Clone)]
pub struct RateLimiter {
    hits: Arc<DashMap<(Action, String), VecDeque<Instant>>>,
    calls: Arc<AtomicUsize>,
    cfg: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self { hits: Arc::new(DashMap::new()), calls: Arc::new(AtomicUsize::new(0)), cfg }
    }

    /// Record an attempt; false once the subject has used its budget for the window.
    pub fn allow(&self, action: Action, subject: &str) -> bool {
        // no shard guard may be held while sweeping
        if self.calls.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.sweep();
        }
        let (limit, window) = self.cfg.budget(action);
        if limit == 0 {
            return false;
        }
        let now = Instant::now();
        let mut hits = self.hits.entry((action, subject.to_string())).or_default();
        while hits.front().is_some_and(|t| now.duration_since(*t) >= window) {
            hits.pop_front();
        }
        if hits.len() >= limit {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Drop hits that fell out of their window and forget subjects with none left.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.hits.retain(|(action, _), hits| {
            let (_, window) = self.cfg.budget(*action);
            while hits.front().is_some_and(|t| now.duration_since(*t) >= window) {
                hits.pop_front();
            }
            !hits.is_empty()
        });
    }

    /// Number of (action, subject) pairs currently holding hits.
    pub fn tracked(&self) -> usize {
        self.hits.len()
    }

    /// Listing creation is keyed by the authenticated user.
    pub fn allow_listing(&self, uid: &str) -> bool {
        self.allow(Action::CreateListing, uid)
    }

    /// Reports may be anonymous, so they are keyed by client address.
    pub fn allow_report(&self, ip: &str) -> bool {
        self.allow(Action::FileReport, ip)
    }
}
