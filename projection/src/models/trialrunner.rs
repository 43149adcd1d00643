use rand::{rngs::StdRng, SeedableRng};
use rayon::{
    iter::{IntoParallelIterator, ParallelIterator},
    ThreadPool, ThreadPoolBuilder,
};
use tracing::{debug, instrument};

use crate::models::pathsimulator::{PathSimulator, SamplePath, SimulationParameters};
use crate::utils::{
    cancel::CancellationToken,
    config::EngineConfig,
    errors::{ProjectionError, Result},
};

const SEED_MIXER: u64 = 0x9e37_79b9_7f4a_7c15;

/// The finished output of one run: every path has been produced before the
/// set exists, so consumers never observe a partially filled collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSet {
    paths: Vec<SamplePath>,
}

impl TrialSet {
    pub fn new(paths: Vec<SamplePath>) -> TrialSet {
        TrialSet { paths }
    }

    pub fn paths(&self) -> &[SamplePath] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn into_paths(self) -> Vec<SamplePath> {
        self.paths
    }
}

/// Runs independent path simulations on a dedicated rayon pool.
///
/// The distribution inside [`SimulationParameters`] is shared read-only by
/// all workers. Every trial owns its own `StdRng`: drawn from entropy, or
/// derived from a master seed and the trial index when a seed is set, which
/// makes seeded runs reproducible whatever the pool size.
pub struct ParallelTrialRunner {
    pool: ThreadPool,
    seed: Option<u64>,
    cancellation: Option<CancellationToken>,
}

impl ParallelTrialRunner {
    pub fn new(config: &EngineConfig) -> Result<ParallelTrialRunner> {
        let prefix = config.thread_name_prefix.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()?;
        Ok(ParallelTrialRunner {
            pool,
            seed: config.seed,
            cancellation: None,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn run(&self, params: &SimulationParameters, trial_count: usize) -> Result<TrialSet> {
        self.run_with_seed(params, trial_count, self.seed)
    }

    /// Blocks until all `trial_count` paths are simulated.
    #[instrument(skip(self, params), fields(steps = params.step_count()))]
    pub fn run_with_seed(
        &self,
        params: &SimulationParameters,
        trial_count: usize,
        seed: Option<u64>,
    ) -> Result<TrialSet> {
        if trial_count < 1 {
            return Err(ProjectionError::InvalidTrialCount(trial_count));
        }
        debug!(threads = self.num_threads(), "dispatching trials");

        let paths = self.pool.install(|| {
            (0..trial_count)
                .into_par_iter()
                .map(|trial| {
                    if self.is_cancelled() {
                        return Err(ProjectionError::Cancelled(trial));
                    }
                    let mut rng = trial_rng(seed, trial);
                    Ok(PathSimulator::simulate(params, &mut rng))
                })
                .collect::<Result<Vec<SamplePath>>>()
        })?;

        debug!(paths = paths.len(), "trials complete");
        Ok(TrialSet::new(paths))
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }
}

fn trial_rng(seed: Option<u64>, trial: usize) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ (trial as u64).wrapping_mul(SEED_MIXER)),
        None => StdRng::from_entropy(),
    }
}
