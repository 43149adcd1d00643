use std::{collections::HashMap, str::FromStr, sync::Arc};

use rust_decimal::Decimal;

use crate::math::randomvariable::{DistributionKind, RandomVariableFactory, MU, SIGMA};
use crate::models::pathsimulator::SimulationParameters;
use crate::utils::errors::{ProjectionError, Result};

/// Flat option map as handed over by the record store.
pub type OptionMap = HashMap<String, String>;

pub const ANALYSIS_LENGTH: &str = "AnalysisLength";
pub const SIM_COUNT: &str = "SimCount";
pub const RANDOM_VARIABLE_MU: &str = "RandomVariableMu";
pub const RANDOM_VARIABLE_SIGMA: &str = "RandomVariableSigma";
pub const RANDOM_VARIABLE_SCALE_FACTOR: &str = "RandomVariableScaleFactor";
pub const RANDOM_VARIABLE_TYPE: &str = "RandomVariableType";
pub const SEED: &str = "Seed";

/// Validated view of an [`OptionMap`].
///
/// Absent `RandomVariableMu` / `RandomVariableSigma` are not an error here:
/// they are left out of [`distribution_params`](Self::distribution_params)
/// and reported by the factory as a missing `Mu` / `Sigma`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    analysis_length: usize,
    sim_count: usize,
    kind: DistributionKind,
    distribution_params: HashMap<String, f64>,
    scale_factor: Decimal,
    seed: Option<u64>,
}

impl SimulationOptions {
    pub fn analysis_length(&self) -> usize {
        self.analysis_length
    }

    pub fn sim_count(&self) -> usize {
        self.sim_count
    }

    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    pub fn distribution_params(&self) -> &HashMap<String, f64> {
        &self.distribution_params
    }

    pub fn scale_factor(&self) -> Decimal {
        self.scale_factor
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Builds the random variable and bundles it with `base_price`.
    pub fn build_parameters(&self, base_price: Decimal) -> Result<SimulationParameters> {
        let rv = RandomVariableFactory::build(self.kind, &self.distribution_params)?;
        SimulationParameters::new(
            base_price,
            self.analysis_length,
            self.scale_factor,
            Arc::new(rv),
        )
    }
}

impl TryFrom<&OptionMap> for SimulationOptions {
    type Error = ProjectionError;

    fn try_from(options: &OptionMap) -> Result<Self> {
        let analysis_length: usize = parse_required(options, ANALYSIS_LENGTH)?;
        if analysis_length == 0 {
            return Err(ProjectionError::malformed(
                ANALYSIS_LENGTH,
                "must be a positive integer",
            ));
        }
        // zero passes here; the runner owns the trial count check
        let sim_count: usize = parse_required(options, SIM_COUNT)?;
        let scale_factor = parse_decimal(options, RANDOM_VARIABLE_SCALE_FACTOR)?;

        let kind = match lookup(options, RANDOM_VARIABLE_TYPE) {
            Some(raw) => raw.parse::<DistributionKind>()?,
            None => DistributionKind::Normal,
        };

        let mut distribution_params = HashMap::new();
        for (key, param) in [(RANDOM_VARIABLE_MU, MU), (RANDOM_VARIABLE_SIGMA, SIGMA)] {
            if let Some(value) = parse_optional_f64(options, key)? {
                distribution_params.insert(param.to_string(), value);
            }
        }

        let seed = match lookup(options, SEED) {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| ProjectionError::malformed(SEED, e.to_string()))?,
            ),
            None => None,
        };

        Ok(SimulationOptions {
            analysis_length,
            sim_count,
            kind,
            distribution_params,
            scale_factor,
            seed,
        })
    }
}

fn lookup<'a>(options: &'a OptionMap, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_required<T>(options: &OptionMap, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(options, key).ok_or_else(|| ProjectionError::malformed(key, "missing"))?;
    raw.parse::<T>()
        .map_err(|e| ProjectionError::malformed(key, format!("{:?}: {}", raw, e)))
}

fn parse_decimal(options: &OptionMap, key: &str) -> Result<Decimal> {
    let raw = lookup(options, key).ok_or_else(|| ProjectionError::malformed(key, "missing"))?;
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| ProjectionError::malformed(key, format!("{:?}: {}", raw, e)))
}

fn parse_optional_f64(options: &OptionMap, key: &str) -> Result<Option<f64>> {
    let Some(raw) = lookup(options, key) else {
        return Ok(None);
    };
    let value = raw
        .parse::<f64>()
        .map_err(|e| ProjectionError::malformed(key, format!("{:?}: {}", raw, e)))?;
    if !value.is_finite() {
        return Err(ProjectionError::malformed(key, "must be finite"));
    }
    Ok(Some(value))
}
