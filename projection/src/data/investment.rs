use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::options::OptionMap;
use crate::utils::errors::{ProjectionError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvestmentId(String);

impl InvestmentId {
    pub fn new(id: impl Into<String>) -> InvestmentId {
        InvestmentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvestmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InvestmentId {
    fn from(id: &str) -> Self {
        InvestmentId::new(id)
    }
}

/// The slice of an investment record the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    id: InvestmentId,
    #[serde(default)]
    name: String,
    base_price: Decimal,
    last_modified: DateTime<Utc>,
    #[serde(default)]
    options: OptionMap,
}

impl Investment {
    pub fn new(id: InvestmentId, base_price: Decimal, last_modified: DateTime<Utc>) -> Investment {
        Investment {
            id,
            name: String::new(),
            base_price,
            last_modified,
            options: OptionMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_options(mut self, options: OptionMap) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> &InvestmentId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Simulation options stored with the record, used when the caller
    /// supplies no override.
    pub fn options(&self) -> &OptionMap {
        &self.options
    }
}

/// Read access to investment records owned by the surrounding application.
pub trait InvestmentStore: Send + Sync {
    fn get_investment(&self, id: &InvestmentId) -> Result<Option<Investment>>;
}

/// In-memory record store.
#[derive(Clone, Default)]
pub struct InvestmentBook {
    investments: Arc<RwLock<HashMap<InvestmentId, Investment>>>,
}

impl InvestmentBook {
    pub fn new() -> InvestmentBook {
        InvestmentBook::default()
    }

    pub fn upsert(&self, investment: Investment) -> Result<()> {
        self.investments
            .write()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?
            .insert(investment.id().clone(), investment);
        Ok(())
    }

    /// Marks a record as modified at `at`.
    pub fn touch(&self, id: &InvestmentId, at: DateTime<Utc>) -> Result<()> {
        let mut investments = self
            .investments
            .write()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?;
        let investment = investments
            .get_mut(id)
            .ok_or_else(|| ProjectionError::InvestmentNotFound(id.to_string()))?;
        investment.last_modified = at;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.investments.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<Vec<Investment>> for InvestmentBook {
    type Error = ProjectionError;

    fn try_from(investments: Vec<Investment>) -> Result<Self> {
        let book = InvestmentBook::new();
        for investment in investments {
            book.upsert(investment)?;
        }
        Ok(book)
    }
}

impl InvestmentStore for InvestmentBook {
    fn get_investment(&self, id: &InvestmentId) -> Result<Option<Investment>> {
        let investments = self
            .investments
            .read()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?;
        Ok(investments.get(id).cloned())
    }
}
