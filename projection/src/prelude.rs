pub use crate::{
    cache::{projectioncache::*, store::*},
    data::{investment::*, options::*, projection::*},
    math::randomvariable::*,
    models::{aggregator::*, pathsimulator::*, pipeline::*, trialrunner::*},
    utils::{cancel::*, clock::*, config::*, errors::*},
};
