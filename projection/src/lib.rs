//! Stochastic projection engine.
//!
//! Projects the value of a holding by simulating many scaled random walks in
//! parallel and reducing them to per-step min / max / mean bands. A freshness
//! cache decides when a stored projection can be served again.
//!
//! ```
//! use projection::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let options = OptionMap::from([
//!     (ANALYSIS_LENGTH.to_string(), "5".to_string()),
//!     (SIM_COUNT.to_string(), "100".to_string()),
//!     (RANDOM_VARIABLE_MU.to_string(), "0.0".to_string()),
//!     (RANDOM_VARIABLE_SIGMA.to_string(), "1.0".to_string()),
//!     (RANDOM_VARIABLE_SCALE_FACTOR.to_string(), "0.5".to_string()),
//! ]);
//! let pipeline = MonteCarloPipeline::new(&EngineConfig::new()).unwrap();
//! let result = pipeline.project(Decimal::from(100), &options).unwrap();
//! assert_eq!(result.len(), 5);
//! assert_eq!(result.avg()[0], Decimal::from(100));
//! ```

pub mod cache;
pub mod data;
pub mod math;
pub mod models;
pub mod prelude;
pub mod utils;
