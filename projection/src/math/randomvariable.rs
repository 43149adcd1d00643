use std::{collections::HashMap, fmt, str::FromStr};

use rand::RngCore;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::errors::{ProjectionError, Result};

pub const MU: &str = "Mu";
pub const SIGMA: &str = "Sigma";

/// A continuous law that can be asked for one draw at a time.
///
/// Implementors hold parameters only. The generator is owned by the caller,
/// so a single instance can be sampled from many threads at once as long as
/// every thread brings its own generator.
pub trait Sampleable: Send + Sync + fmt::Debug {
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
}

/// Every distribution family the engine knows by name. Only [`Normal`] and
/// [`LogNormal`] have a construction rule; the rest are rejected by
/// [`RandomVariableFactory::build`].
///
/// [`Normal`]: DistributionKind::Normal
/// [`LogNormal`]: DistributionKind::LogNormal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistributionKind {
    Normal,
    LogNormal,
    Uniform,
    Exponential,
    Gamma,
    Beta,
    ChiSquared,
    StudentT,
    Cauchy,
    Weibull,
    Pareto,
    Triangular,
    Erlang,
    Laplace,
    Logistic,
    Rayleigh,
}

impl DistributionKind {
    pub const ALL: [DistributionKind; 16] = [
        DistributionKind::Normal,
        DistributionKind::LogNormal,
        DistributionKind::Uniform,
        DistributionKind::Exponential,
        DistributionKind::Gamma,
        DistributionKind::Beta,
        DistributionKind::ChiSquared,
        DistributionKind::StudentT,
        DistributionKind::Cauchy,
        DistributionKind::Weibull,
        DistributionKind::Pareto,
        DistributionKind::Triangular,
        DistributionKind::Erlang,
        DistributionKind::Laplace,
        DistributionKind::Logistic,
        DistributionKind::Rayleigh,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DistributionKind::Normal => "NORMAL",
            DistributionKind::LogNormal => "LOGNORMAL",
            DistributionKind::Uniform => "UNIFORM",
            DistributionKind::Exponential => "EXPONENTIAL",
            DistributionKind::Gamma => "GAMMA",
            DistributionKind::Beta => "BETA",
            DistributionKind::ChiSquared => "CHISQUARED",
            DistributionKind::StudentT => "STUDENTT",
            DistributionKind::Cauchy => "CAUCHY",
            DistributionKind::Weibull => "WEIBULL",
            DistributionKind::Pareto => "PARETO",
            DistributionKind::Triangular => "TRIANGULAR",
            DistributionKind::Erlang => "ERLANG",
            DistributionKind::Laplace => "LAPLACE",
            DistributionKind::Logistic => "LOGISTIC",
            DistributionKind::Rayleigh => "RAYLEIGH",
        }
    }

    /// Parameter keys a kind needs. Empty for kinds without a construction rule.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            DistributionKind::Normal | DistributionKind::LogNormal => &[MU, SIGMA],
            _ => &[],
        }
    }

    pub fn is_supported(&self) -> bool {
        !self.required_parameters().is_empty()
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DistributionKind {
    type Err = ProjectionError;

    /// Case-insensitive; `_`, `-` and spaces are ignored so `LOG_NORMAL`,
    /// `LogNormal` and `lognormal` all name the same kind.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        DistributionKind::ALL
            .iter()
            .find(|kind| kind.name() == normalized)
            .copied()
            .ok_or_else(|| ProjectionError::UnsupportedDistribution(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Law {
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
}

/// A parameterized, immutable random variable.
#[derive(Debug, Clone, Copy)]
pub struct RandomVariable {
    kind: DistributionKind,
    mu: f64,
    sigma: f64,
    law: Law,
}

impl RandomVariable {
    pub fn kind(&self) -> DistributionKind {
        self.kind
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Sampleable for RandomVariable {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        match &self.law {
            Law::Normal(d) => d.sample(rng),
            Law::LogNormal(d) => d.sample(rng),
        }
    }
}

/// Builds [`RandomVariable`]s from a kind and a named parameter map.
pub struct RandomVariableFactory;

impl RandomVariableFactory {
    pub fn build(kind: DistributionKind, params: &HashMap<String, f64>) -> Result<RandomVariable> {
        if !kind.is_supported() {
            return Err(ProjectionError::UnsupportedDistribution(kind.to_string()));
        }
        let mu = required(params, MU)?;
        let sigma = required(params, SIGMA)?;
        if !mu.is_finite() {
            return Err(ProjectionError::InvalidParameter(format!(
                "{} must be finite, got {}",
                MU, mu
            )));
        }

        let law = match kind {
            DistributionKind::Normal => Normal::new(mu, sigma).map(Law::Normal),
            DistributionKind::LogNormal => LogNormal::new(mu, sigma).map(Law::LogNormal),
            _ => return Err(ProjectionError::UnsupportedDistribution(kind.to_string())),
        }
        .map_err(|e| {
            ProjectionError::InvalidParameter(format!("{} = {}: {}", SIGMA, sigma, e))
        })?;

        debug!(%kind, mu, sigma, "built random variable");
        Ok(RandomVariable {
            kind,
            mu,
            sigma,
            law,
        })
    }
}

fn required(params: &HashMap<String, f64>, key: &str) -> Result<f64> {
    params
        .get(key)
        .copied()
        .ok_or_else(|| ProjectionError::MissingParameter(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use statrs::distribution::{LogNormal as AnalyticLogNormal, Normal as AnalyticNormal};
    use statrs::statistics::Distribution as _;

    fn params(mu: f64, sigma: f64) -> HashMap<String, f64> {
        HashMap::from([(MU.to_string(), mu), (SIGMA.to_string(), sigma)])
    }

    fn sample_mean(rv: &RandomVariable, n: usize) -> f64 {
        let mut rng = StdRng::seed_from_u64(42);
        (0..n).map(|_| rv.sample(&mut rng)).sum::<f64>() / n as f64
    }

    #[test]
    fn test_parse_kind() -> Result<()> {
        assert_eq!("NORMAL".parse::<DistributionKind>()?, DistributionKind::Normal);
        assert_eq!("LogNormal".parse::<DistributionKind>()?, DistributionKind::LogNormal);
        assert_eq!("log_normal".parse::<DistributionKind>()?, DistributionKind::LogNormal);
        assert_eq!("Student-T".parse::<DistributionKind>()?, DistributionKind::StudentT);
        assert!(matches!(
            "Zipf".parse::<DistributionKind>(),
            Err(ProjectionError::UnsupportedDistribution(_))
        ));
        Ok(())
    }

    #[test]
    fn test_build_normal() -> Result<()> {
        let rv = RandomVariableFactory::build(DistributionKind::Normal, &params(0.5, 0.1))?;
        assert_eq!(rv.kind(), DistributionKind::Normal);
        assert_eq!(rv.mu(), 0.5);
        assert_eq!(rv.sigma(), 0.1);

        let expected = AnalyticNormal::new(0.5, 0.1).unwrap().mean().unwrap();
        assert!((sample_mean(&rv, 20_000) - expected).abs() < 0.01);
        Ok(())
    }

    #[test]
    fn test_build_lognormal() -> Result<()> {
        let rv = RandomVariableFactory::build(DistributionKind::LogNormal, &params(0.0, 0.25))?;
        let expected = AnalyticLogNormal::new(0.0, 0.25).unwrap().mean().unwrap();
        assert!((sample_mean(&rv, 20_000) - expected).abs() < 0.02);

        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..1_000).all(|_| rv.sample(&mut rng) > 0.0));
        Ok(())
    }

    #[test]
    fn test_zero_sigma_is_degenerate() -> Result<()> {
        let rv = RandomVariableFactory::build(DistributionKind::Normal, &params(1.5, 0.0))?;
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(rv.sample(&mut rng), 1.5);
        Ok(())
    }

    #[test]
    fn test_missing_sigma() {
        let mut p = params(0.0, 1.0);
        p.remove(SIGMA);
        let err = RandomVariableFactory::build(DistributionKind::Normal, &p).unwrap_err();
        assert_eq!(err, ProjectionError::MissingParameter("Sigma".to_string()));
    }

    #[test]
    fn test_missing_mu() {
        let mut p = params(0.0, 1.0);
        p.remove(MU);
        let err = RandomVariableFactory::build(DistributionKind::LogNormal, &p).unwrap_err();
        assert_eq!(err, ProjectionError::MissingParameter("Mu".to_string()));
    }

    #[test]
    fn test_negative_sigma() {
        let err = RandomVariableFactory::build(DistributionKind::Normal, &params(0.0, -1.0))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidParameter(_)));
    }

    #[test]
    fn test_declared_kinds_are_not_built() {
        for kind in DistributionKind::ALL.iter().filter(|k| !k.is_supported()) {
            let err = RandomVariableFactory::build(*kind, &params(0.0, 1.0)).unwrap_err();
            assert_eq!(
                err,
                ProjectionError::UnsupportedDistribution(kind.to_string())
            );
        }
    }
}
