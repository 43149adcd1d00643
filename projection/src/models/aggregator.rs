use chrono::Utc;
use rust_decimal::Decimal;

use crate::data::projection::ProjectionResult;
use crate::models::trialrunner::TrialSet;
use crate::utils::errors::{ProjectionError, Result};

pub struct ProjectionAggregator;

impl ProjectionAggregator {
    /// Reduces a finished trial set to per-step min / max / mean in a single
    /// pass, tracking running extrema and sums.
    pub fn aggregate(trials: &TrialSet, step_count: usize) -> Result<ProjectionResult> {
        let (first, rest) = trials
            .paths()
            .split_first()
            .ok_or(ProjectionError::EmptyTrialSet)?;

        if let Some(path) = trials.paths().iter().find(|p| p.len() != step_count) {
            return Err(ProjectionError::InconsistentPathLength {
                expected: step_count,
                found: path.len(),
            });
        }

        let mut min = first.values().to_vec();
        let mut max = first.values().to_vec();
        // None once the plain sum leaves the decimal range
        let mut sum: Vec<Option<Decimal>> = first.values().iter().map(|v| Some(*v)).collect();

        for path in rest {
            for (i, value) in path.values().iter().enumerate() {
                if *value < min[i] {
                    min[i] = *value;
                }
                if *value > max[i] {
                    max[i] = *value;
                }
                sum[i] = sum[i].and_then(|s| s.checked_add(*value));
            }
        }

        let count = Decimal::from(trials.len());
        let avg = sum
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mean = match s {
                    Some(s) => *s / count,
                    None => trials
                        .paths()
                        .iter()
                        .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.values()[i] / count)),
                };
                // rounding in a 28-digit sum can leave the mean one ulp outside the band
                mean.max(min[i]).min(max[i])
            })
            .collect();

        Ok(ProjectionResult::new(min, max, avg, Utc::now()))
    }
}
