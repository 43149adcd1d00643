use rust_decimal::Decimal;
use tracing::debug;

use crate::data::{
    options::{OptionMap, SimulationOptions, ANALYSIS_LENGTH},
    projection::ProjectionResult,
};
use crate::models::{aggregator::ProjectionAggregator, trialrunner::ParallelTrialRunner};
use crate::utils::{
    config::{EngineConfig, DEFAULT_MAX_PATH_VALUES},
    errors::{ProjectionError, Result},
};

/// Turns a base price and an option map into a projection.
pub trait ProjectionPipeline: Send + Sync {
    fn project(&self, base_price: Decimal, options: &OptionMap) -> Result<ProjectionResult>;
}

/// Factory, parallel trials, then aggregation.
pub struct MonteCarloPipeline {
    runner: ParallelTrialRunner,
    max_path_values: usize,
}

impl MonteCarloPipeline {
    pub fn new(config: &EngineConfig) -> Result<MonteCarloPipeline> {
        Ok(MonteCarloPipeline {
            runner: ParallelTrialRunner::new(config)?,
            max_path_values: config.max_path_values,
        })
    }

    pub fn with_runner(runner: ParallelTrialRunner) -> MonteCarloPipeline {
        MonteCarloPipeline {
            runner,
            max_path_values: DEFAULT_MAX_PATH_VALUES,
        }
    }

    pub fn with_max_path_values(mut self, max_path_values: usize) -> Self {
        self.max_path_values = max_path_values;
        self
    }

    pub fn runner(&self) -> &ParallelTrialRunner {
        &self.runner
    }

    /// Rejects runs whose trial paths would hold more than `max_path_values`
    /// decimals in total, before anything is allocated.
    fn check_size(&self, options: &SimulationOptions) -> Result<()> {
        match options.analysis_length().checked_mul(options.sim_count()) {
            Some(total) if total <= self.max_path_values => Ok(()),
            total => Err(ProjectionError::malformed(
                ANALYSIS_LENGTH,
                format!(
                    "{} steps x {} trials = {} path values, limit is {}",
                    options.analysis_length(),
                    options.sim_count(),
                    total.map_or_else(|| "overflowing".to_string(), |t| t.to_string()),
                    self.max_path_values
                ),
            )),
        }
    }
}

impl ProjectionPipeline for MonteCarloPipeline {
    fn project(&self, base_price: Decimal, options: &OptionMap) -> Result<ProjectionResult> {
        let options = SimulationOptions::try_from(options)?;
        self.check_size(&options)?;
        let params = options.build_parameters(base_price)?;
        debug!(
            kind = %options.kind(),
            steps = options.analysis_length(),
            trials = options.sim_count(),
            "running projection"
        );
        // an explicit Seed option wins over the engine seed
        let seed = options.seed().or(self.runner.seed());
        let trials = self
            .runner
            .run_with_seed(&params, options.sim_count(), seed)?;
        ProjectionAggregator::aggregate(&trials, params.step_count())
    }
}
