use std::sync::Arc;

use rand::RngCore;
use rust_decimal::{prelude::FromPrimitive, Decimal};
use serde::Serialize;

use crate::math::randomvariable::Sampleable;
use crate::utils::errors::{ProjectionError, Result};

/// Inputs for one scaled random walk. Immutable; shared by every trial of a run.
#[derive(Debug, Clone)]
pub struct SimulationParameters {
    base_price: Decimal,
    step_count: usize,
    scale_factor: Decimal,
    distribution: Arc<dyn Sampleable>,
}

impl SimulationParameters {
    pub fn new(
        base_price: Decimal,
        step_count: usize,
        scale_factor: Decimal,
        distribution: Arc<dyn Sampleable>,
    ) -> Result<SimulationParameters> {
        if step_count == 0 {
            return Err(ProjectionError::InvalidStepCount(step_count));
        }
        Ok(SimulationParameters {
            base_price,
            step_count,
            scale_factor,
            distribution,
        })
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn scale_factor(&self) -> Decimal {
        self.scale_factor
    }

    pub fn distribution(&self) -> &Arc<dyn Sampleable> {
        &self.distribution
    }
}

/// One simulated trajectory. `values()[0]` is always the base price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePath(Vec<Decimal>);

impl SamplePath {
    pub fn values(&self) -> &[Decimal] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Decimal>> for SamplePath {
    fn from(values: Vec<Decimal>) -> Self {
        SamplePath(values)
    }
}

pub struct PathSimulator;

impl PathSimulator {
    /// Walks `step_count` steps from the base price. Each recorded value is
    /// the level before that step's increment, so the final draw only moves
    /// the accumulator and is never recorded.
    pub fn simulate(params: &SimulationParameters, rng: &mut dyn RngCore) -> SamplePath {
        let mut level = params.base_price();
        let mut values = Vec::with_capacity(params.step_count());
        for _ in 0..params.step_count() {
            values.push(level);
            let draw = to_decimal(params.distribution().sample(rng));
            level = level.saturating_add(params.scale_factor().saturating_mul(draw));
        }
        SamplePath(values)
    }
}

/// Draws beyond the decimal range saturate; NaN maps to zero.
fn to_decimal(draw: f64) -> Decimal {
    Decimal::from_f64(draw).unwrap_or(if draw.is_nan() {
        Decimal::ZERO
    } else if draw > 0.0 {
        Decimal::MAX
    } else {
        Decimal::MIN
    })
}
