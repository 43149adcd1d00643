pub mod aggregator;
pub mod pathsimulator;
pub mod pipeline;
pub mod trialrunner;
