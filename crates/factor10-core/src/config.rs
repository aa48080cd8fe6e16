use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for breakdown and pass/fail draws. The RNG is reseeded from it on
    /// every successful compile.
    pub seed: u64,
    /// Statements and loop iterations a script may execute before it is
    /// aborted.
    pub max_script_steps: u64,
}

impl SimConfig {
    pub const DEFAULT_SEED: u64 = 0x0FAC_7010;
    pub const DEFAULT_MAX_SCRIPT_STEPS: u64 = 1_000_000;

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: Self::DEFAULT_SEED,
            max_script_steps: Self::DEFAULT_MAX_SCRIPT_STEPS,
        }
    }
}
