use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::cache::store::ProjectionStore;
use crate::data::{
    investment::{InvestmentId, InvestmentStore},
    options::OptionMap,
    projection::ProjectionResult,
};
use crate::models::pipeline::ProjectionPipeline;
use crate::utils::{
    clock::{Clock, SystemClock},
    errors::{ProjectionError, Result},
};

/// Freshness of the stored projection for one investment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing stored yet.
    Absent,
    /// Stored result is at least as recent as the record and no override was given.
    Fresh,
    /// Record changed after generation, or an override forces a rerun.
    Stale,
}

impl CacheState {
    pub fn classify(
        cached: Option<&ProjectionResult>,
        last_modified: DateTime<Utc>,
        has_override: bool,
    ) -> CacheState {
        match cached {
            None => CacheState::Absent,
            Some(_) if has_override => CacheState::Stale,
            Some(result) if result.generated_at() < last_modified => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            CacheState::Absent => "absent",
            CacheState::Fresh => "fresh",
            CacheState::Stale => "stale",
        };
        write!(f, "{}", state)
    }
}

/// Decides between reusing a stored projection and running the pipeline.
///
/// Recomputations for the same investment are serialized, and the store is
/// only written once a full result exists.
pub struct ProjectionCache {
    investments: Arc<dyn InvestmentStore>,
    projections: Arc<dyn ProjectionStore>,
    pipeline: Arc<dyn ProjectionPipeline>,
    clock: Arc<dyn Clock>,
    locks: Mutex<HashMap<InvestmentId, Arc<Mutex<()>>>>,
}

impl ProjectionCache {
    pub fn new(
        investments: Arc<dyn InvestmentStore>,
        projections: Arc<dyn ProjectionStore>,
        pipeline: Arc<dyn ProjectionPipeline>,
    ) -> ProjectionCache {
        ProjectionCache {
            investments,
            projections,
            pipeline,
            clock: Arc::new(SystemClock),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current state for `id` as seen by a call without overrides.
    pub fn state(&self, id: &InvestmentId) -> Result<CacheState> {
        let investment = self
            .investments
            .get_investment(id)?
            .ok_or_else(|| ProjectionError::InvestmentNotFound(id.to_string()))?;
        let cached = self.projections.load(id)?;
        Ok(CacheState::classify(
            cached.as_ref(),
            investment.last_modified(),
            false,
        ))
    }

    /// Returns the stored projection when fresh, otherwise recomputes it.
    ///
    /// A non-empty `overrides` map always recomputes and replaces the
    /// record's own options for that run.
    #[instrument(skip(self, overrides), fields(investment = %id))]
    pub fn get_or_compute(
        &self,
        id: &InvestmentId,
        overrides: Option<&OptionMap>,
    ) -> Result<ProjectionResult> {
        let overrides = overrides.filter(|o| !o.is_empty());

        let lock = self.lock_for(id)?;
        let _guard = lock
            .lock()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?;

        // stamped before the record is read: an edit landing mid-run must
        // leave the new result stale
        let stamp = self.clock.now();
        let investment = self
            .investments
            .get_investment(id)?
            .ok_or_else(|| ProjectionError::InvestmentNotFound(id.to_string()))?;

        let cached = self.projections.load(id)?;
        let state = CacheState::classify(
            cached.as_ref(),
            investment.last_modified(),
            overrides.is_some(),
        );
        if let (CacheState::Fresh, Some(result)) = (state, cached) {
            debug!("serving cached projection");
            return Ok(result);
        }

        info!(%state, overridden = overrides.is_some(), "recomputing projection");
        let options = overrides.unwrap_or(investment.options());
        let result = self
            .pipeline
            .project(investment.base_price(), options)?
            .with_generated_at(stamp);
        self.projections.save(id, result.clone())?;
        Ok(result)
    }

    fn lock_for(&self, id: &InvestmentId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| ProjectionError::StoreError(e.to_string()))?;
        Ok(locks.entry(id.clone()).or_default().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::InMemoryProjectionStore;
    use crate::data::investment::{Investment, InvestmentBook};
    use crate::data::options::*;
    use crate::models::pipeline::MonteCarloPipeline;
    use crate::utils::{clock::ManualClock, config::EngineConfig};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps the real pipeline and counts invocations.
    struct CountingPipeline {
        inner: MonteCarloPipeline,
        calls: AtomicUsize,
    }

    impl CountingPipeline {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ProjectionPipeline for CountingPipeline {
        fn project(&self, base_price: Decimal, options: &OptionMap) -> Result<ProjectionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.project(base_price, options)
        }
    }

    struct Fixture {
        book: InvestmentBook,
        store: InMemoryProjectionStore,
        pipeline: Arc<CountingPipeline>,
        clock: Arc<ManualClock>,
        cache: ProjectionCache,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn options(steps: &str) -> OptionMap {
        OptionMap::from([
            (ANALYSIS_LENGTH.to_string(), steps.to_string()),
            (SIM_COUNT.to_string(), "40".to_string()),
            (RANDOM_VARIABLE_MU.to_string(), "0.0".to_string()),
            (RANDOM_VARIABLE_SIGMA.to_string(), "2.0".to_string()),
            (RANDOM_VARIABLE_SCALE_FACTOR.to_string(), "1".to_string()),
        ])
    }

    fn fixture() -> Fixture {
        let book = InvestmentBook::new();
        book.upsert(
            Investment::new("acme".into(), Decimal::from(100), start() - Duration::days(1))
                .with_options(options("10")),
        )
        .unwrap();
        let store = InMemoryProjectionStore::new();
        let pipeline = Arc::new(CountingPipeline {
            inner: MonteCarloPipeline::new(&EngineConfig::new().with_num_threads(2)).unwrap(),
            calls: AtomicUsize::new(0),
        });
        let clock = Arc::new(ManualClock::new(start()));
        let cache = ProjectionCache::new(
            Arc::new(book.clone()),
            Arc::new(store.clone()),
            pipeline.clone(),
        )
        .with_clock(clock.clone());
        Fixture {
            book,
            store,
            pipeline,
            clock,
            cache,
        }
    }

    #[test]
    fn test_classify() {
        let at = start();
        let result = ProjectionResult::new(vec![], vec![], vec![], at);
        assert_eq!(CacheState::classify(None, at, false), CacheState::Absent);
        assert_eq!(CacheState::classify(None, at, true), CacheState::Absent);
        assert_eq!(CacheState::classify(Some(&result), at, false), CacheState::Fresh);
        assert_eq!(
            CacheState::classify(Some(&result), at - Duration::seconds(1), false),
            CacheState::Fresh
        );
        assert_eq!(
            CacheState::classify(Some(&result), at + Duration::seconds(1), false),
            CacheState::Stale
        );
        assert_eq!(CacheState::classify(Some(&result), at, true), CacheState::Stale);
    }

    #[test]
    fn test_second_call_is_served_from_cache() -> Result<()> {
        let f = fixture();
        let id = InvestmentId::new("acme");
        assert_eq!(f.cache.state(&id)?, CacheState::Absent);

        let first = f.cache.get_or_compute(&id, None)?;
        assert_eq!(first.generated_at(), start());
        assert_eq!(f.cache.state(&id)?, CacheState::Fresh);

        f.clock.advance(Duration::minutes(5));
        let second = f.cache.get_or_compute(&id, None)?;
        assert_eq!(first, second);
        assert_eq!(f.pipeline.calls(), 1);
        Ok(())
    }

    #[test]
    fn test_empty_override_does_not_force() -> Result<()> {
        let f = fixture();
        let id = InvestmentId::new("acme");
        f.cache.get_or_compute(&id, None)?;
        f.cache.get_or_compute(&id, Some(&OptionMap::new()))?;
        assert_eq!(f.pipeline.calls(), 1);
        Ok(())
    }

    #[test]
    fn test_override_forces_recompute() -> Result<()> {
        let f = fixture();
        let id = InvestmentId::new("acme");
        let first = f.cache.get_or_compute(&id, None)?;
        assert_eq!(first.len(), 10);

        f.clock.advance(Duration::seconds(1));
        let overridden = f.cache.get_or_compute(&id, Some(&options("4")))?;
        assert_eq!(f.pipeline.calls(), 2);
        assert_eq!(overridden.len(), 4);
        assert_eq!(f.store.load(&id)?, Some(overridden.clone()));

        // the overridden result is now the fresh one
        let again = f.cache.get_or_compute(&id, None)?;
        assert_eq!(again, overridden);
        assert_eq!(f.pipeline.calls(), 2);
        Ok(())
    }

    #[test]
    fn test_modified_record_is_recomputed() -> Result<()> {
        let f = fixture();
        let id = InvestmentId::new("acme");
        let first = f.cache.get_or_compute(&id, None)?;

        f.clock.advance(Duration::seconds(10));
        f.book.touch(&id, first.generated_at() + Duration::seconds(5))?;
        assert_eq!(f.cache.state(&id)?, CacheState::Stale);

        let second = f.cache.get_or_compute(&id, None)?;
        assert_eq!(f.pipeline.calls(), 2);
        assert!(second.generated_at() > first.generated_at());
        assert_eq!(f.cache.state(&id)?, CacheState::Fresh);
        Ok(())
    }

    /// Edits the record while the projection is running.
    struct EditingPipeline {
        inner: MonteCarloPipeline,
        book: InvestmentBook,
        clock: Arc<ManualClock>,
    }

    impl ProjectionPipeline for EditingPipeline {
        fn project(&self, base_price: Decimal, options: &OptionMap) -> Result<ProjectionResult> {
            let result = self.inner.project(base_price, options)?;
            self.book.upsert(
                Investment::new(
                    "acme".into(),
                    Decimal::from(999),
                    self.clock.now() + Duration::seconds(1),
                )
                .with_options(options.clone()),
            )?;
            self.clock.advance(Duration::seconds(2));
            Ok(result)
        }
    }

    #[test]
    fn test_edit_during_recompute_leaves_result_stale() -> Result<()> {
        let f = fixture();
        let pipeline = Arc::new(EditingPipeline {
            inner: MonteCarloPipeline::new(&EngineConfig::new().with_num_threads(2))?,
            book: f.book.clone(),
            clock: f.clock.clone(),
        });
        let cache = ProjectionCache::new(
            Arc::new(f.book.clone()),
            Arc::new(f.store.clone()),
            pipeline,
        )
        .with_clock(f.clock.clone());
        let id = InvestmentId::new("acme");

        let first = cache.get_or_compute(&id, None)?;
        assert_eq!(first.generated_at(), start());
        assert_eq!(first.avg()[0], Decimal::from(100));
        assert_eq!(cache.state(&id)?, CacheState::Stale);
        Ok(())
    }

    #[test]
    fn test_unknown_investment() {
        let f = fixture();
        let err = f
            .cache
            .get_or_compute(&InvestmentId::new("ghost"), None)
            .unwrap_err();
        assert_eq!(err, ProjectionError::InvestmentNotFound("ghost".to_string()));
        assert_eq!(f.pipeline.calls(), 0);
    }

    #[test]
    fn test_failed_recompute_keeps_old_result() -> Result<()> {
        let f = fixture();
        let id = InvestmentId::new("acme");
        let first = f.cache.get_or_compute(&id, None)?;

        let mut broken = options("10");
        broken.remove(RANDOM_VARIABLE_SIGMA);
        let err = f.cache.get_or_compute(&id, Some(&broken)).unwrap_err();
        assert_eq!(err, ProjectionError::MissingParameter("Sigma".to_string()));
        assert_eq!(f.store.load(&id)?, Some(first));
        Ok(())
    }

    #[test]
    fn test_concurrent_callers_compute_once() -> Result<()> {
        let f = fixture();
        let id = InvestmentId::new("acme");
        let results = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| f.cache.get_or_compute(&id, None)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Result<Vec<_>>>()
        })?;
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(f.pipeline.calls(), 1);
        Ok(())
    }
}
