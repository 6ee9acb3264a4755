use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `TASKQ_PROFILE` env var. When set (e.g. `TEST`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("TASKQ_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            scheduler: SchedulerConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduler:   initial_capacity={}, verify_invariants={}",
            self.scheduler.initial_capacity,
            self.scheduler.verify_invariants
        );
    }

    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "scheduler": {
                "initial_capacity": self.scheduler.initial_capacity,
                "verify_invariants": self.scheduler.verify_invariants,
            },
        })
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// Scheduler tuning, from env or any serde source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Slots pre-allocated for the heap and the registry.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Re-check every heap and registry invariant after each mutation.
    #[serde(default)]
    pub verify_invariants: bool,
}

fn default_initial_capacity() -> usize { 64 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            verify_invariants: false,
        }
    }
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            initial_capacity: profiled_env_usize(
                p,
                "SCHEDULER_INITIAL_CAPACITY",
                default_initial_capacity(),
            ),
            verify_invariants: profiled_env_bool(p, "SCHEDULER_VERIFY_INVARIANTS", false),
        }
    }
}
