//! Solver runtime configuration: timing and informational thresholds.
//!
//! None of these values gate the core algorithms directly — `quoter` and
//! `filler` take their inputs as explicit parameters/context per the
//! `SolverContext` boundary. This config only feeds the bin's logging and
//! the orchestrator's deadline-slack preflight check.

use std::sync::OnceLock;
use tracing::info;

/// Runtime knobs for a solver process.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Preflight slack required between now and a plan's earliest deadline.
    /// Corresponds to `MAX_FILL_TIME_SECONDS` in the orchestrator.
    #[serde(default = "default_max_fill_time_secs")]
    pub max_fill_time_secs: u64,
    /// Informational minimum profit in USD; not enforced by the quoter
    /// (which gates on non-negative PnL only), surfaced for operator logs.
    #[serde(default = "default_min_profit_usd")]
    pub min_profit_usd: f64,
    /// Informational slippage budget in basis points, surfaced for logs.
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
}

fn default_max_fill_time_secs() -> u64 {
    600
}

fn default_min_profit_usd() -> f64 {
    0.0
}

fn default_slippage_bps() -> u32 {
    50
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_fill_time_secs: default_max_fill_time_secs(),
            min_profit_usd: default_min_profit_usd(),
            slippage_bps: default_slippage_bps(),
        }
    }
}

impl RuntimeConfig {
    /// Profile tuned for local/integration testing: short deadline slack so
    /// tests don't need to fabricate far-future plans.
    pub fn testing() -> Self {
        Self {
            max_fill_time_secs: 30,
            min_profit_usd: 0.0,
            slippage_bps: 100,
        }
    }

    /// Profile tuned for production operation.
    pub fn production() -> Self {
        Self::default()
    }

    /// Load a profile named by the `SOLVER_PROFILE` env var, defaulting to
    /// production semantics when unset or unrecognized.
    pub fn from_env() -> Self {
        match std::env::var("SOLVER_PROFILE").as_deref() {
            Ok("testing") => Self::testing(),
            Ok("production") | Err(_) | Ok(_) => Self::production(),
        }
    }

    /// Emit the active configuration as structured log fields.
    pub fn log_config(&self) {
        info!(
            max_fill_time_secs = self.max_fill_time_secs,
            min_profit_usd = self.min_profit_usd,
            slippage_bps = self.slippage_bps,
            "runtime configuration loaded"
        );
    }
}

static GLOBAL_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Install the process-wide runtime configuration. Must be called at most
/// once; subsequent calls are no-ops.
pub fn init_config(cfg: RuntimeConfig) {
    let _ = GLOBAL_CONFIG.set(cfg);
}

/// Access the process-wide runtime configuration, falling back to
/// production defaults if `init_config` was never called.
pub fn config() -> &'static RuntimeConfig {
    GLOBAL_CONFIG.get_or_init(RuntimeConfig::production)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_profile_has_short_slack() {
        let cfg = RuntimeConfig::testing();
        assert_eq!(cfg.max_fill_time_secs, 30);
    }

    #[test]
    fn production_profile_matches_default() {
        assert_eq!(
            RuntimeConfig::production().max_fill_time_secs,
            RuntimeConfig::default().max_fill_time_secs
        );
    }
}
