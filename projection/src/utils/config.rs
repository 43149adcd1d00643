use serde::{Deserialize, Serialize};

/// Engine-level settings shared by every projection run.
///
/// `num_threads == 0` lets rayon pick one worker per logical core.
/// `max_path_values` caps `AnalysisLength * SimCount` for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub num_threads: usize,
    pub thread_name_prefix: String,
    pub seed: Option<u64>,
    pub max_path_values: usize,
}

pub const DEFAULT_MAX_PATH_VALUES: usize = 50_000_000;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            thread_name_prefix: "projection-trial".to_string(),
            seed: None,
            max_path_values: DEFAULT_MAX_PATH_VALUES,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_path_values(mut self, max_path_values: usize) -> Self {
        self.max_path_values = max_path_values;
        self
    }
}
