use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::data::{investment::InvestmentId, projection::ProjectionResult};
use crate::utils::errors::{ProjectionError, Result};

/// Durable home of computed projections, keyed by investment.
///
/// `save` replaces the whole entry at once; readers see either the previous
/// result or the new one.
pub trait ProjectionStore: Send + Sync {
    fn load(&self, id: &InvestmentId) -> Result<Option<ProjectionResult>>;
    fn save(&self, id: &InvestmentId, result: ProjectionResult) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryProjectionStore {
    entries: Arc<RwLock<HashMap<InvestmentId, ProjectionResult>>>,
}

impl InMemoryProjectionStore {
    pub fn new() -> InMemoryProjectionStore {
        InMemoryProjectionStore::default()
    }

    pub fn remove(&self, id: &InvestmentId) -> Result<Option<ProjectionResult>> {
        Ok(self
            .entries
            .write()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?
            .remove(id))
    }
}

impl ProjectionStore for InMemoryProjectionStore {
    fn load(&self, id: &InvestmentId) -> Result<Option<ProjectionResult>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?;
        Ok(entries.get(id).cloned())
    }

    fn save(&self, id: &InvestmentId, result: ProjectionResult) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?
            .insert(id.clone(), result);
        Ok(())
    }
}
