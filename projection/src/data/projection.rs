use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

/// Min / max / mean bands per time step plus the moment they were generated.
///
/// Results are never edited in place. A recomputation produces a new value
/// that replaces the old one in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    min: Vec<Decimal>,
    max: Vec<Decimal>,
    avg: Vec<Decimal>,
    generated_at: DateTime<Utc>,
}

/// Bands at the last projected step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HorizonSummary {
    pub step: usize,
    pub min: Decimal,
    pub avg: Decimal,
    pub max: Decimal,
}

impl ProjectionResult {
    pub fn new(
        min: Vec<Decimal>,
        max: Vec<Decimal>,
        avg: Vec<Decimal>,
        generated_at: DateTime<Utc>,
    ) -> ProjectionResult {
        ProjectionResult {
            min,
            max,
            avg,
            generated_at,
        }
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn min(&self) -> &[Decimal] {
        &self.min
    }

    pub fn max(&self) -> &[Decimal] {
        &self.max
    }

    pub fn avg(&self) -> &[Decimal] {
        &self.avg
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn len(&self) -> usize {
        self.avg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avg.is_empty()
    }

    pub fn horizon_summary(&self) -> Option<HorizonSummary> {
        let step = self.len().checked_sub(1)?;
        Some(HorizonSummary {
            step,
            min: self.min[step],
            avg: self.avg[step],
            max: self.max[step],
        })
    }

    /// Lossy view for charting consumers, in `(min, avg, max)` order.
    pub fn to_f64_series(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let convert = |series: &[Decimal]| {
            series
                .iter()
                .map(|v| v.to_f64().unwrap_or(f64::NAN))
                .collect::<Vec<f64>>()
        };
        (convert(&self.min), convert(&self.avg), convert(&self.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result() -> ProjectionResult {
        ProjectionResult::new(
            vec![Decimal::from(10), Decimal::from(8)],
            vec![Decimal::from(10), Decimal::from(14)],
            vec![Decimal::from(10), Decimal::new(115, 1)],
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_horizon_summary() {
        let summary = result().horizon_summary().unwrap();
        assert_eq!(summary.step, 1);
        assert_eq!(summary.min, Decimal::from(8));
        assert_eq!(summary.avg, Decimal::new(115, 1));
        assert_eq!(summary.max, Decimal::from(14));

        let empty = ProjectionResult::new(vec![], vec![], vec![], Utc::now());
        assert!(empty.is_empty());
        assert!(empty.horizon_summary().is_none());
    }

    #[test]
    fn test_f64_series() {
        let (min, avg, max) = result().to_f64_series();
        assert_eq!(min, vec![10.0, 8.0]);
        assert_eq!(avg, vec![10.0, 11.5]);
        assert_eq!(max, vec![10.0, 14.0]);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(result()).unwrap();
        assert_eq!(json["avg"][1], "11.5");
        assert_eq!(json["generated_at"], "2024-03-01T12:00:00Z");
        let back: ProjectionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result());
    }
}
