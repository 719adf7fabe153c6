//! Circuit breaker and cache fallback around question-bank reads.

mod breaker;
mod clock;

pub use breaker::{BreakerConfig, BreakerStatus, CircuitBreaker};
pub use clock::{Clock, ManualClock, SystemClock};

use std::sync::Arc;

use moka::sync::Cache;
use tracing::warn;

use crate::domain::{
    BehavioralIndicator, Competency, CompetencyId, IndicatorId, Question, QuestionId,
};
use crate::lookup::{LookupError, QuestionBank};

/// Question bank decorator: every backend read goes through a circuit
/// breaker, and competency reads are cached so they can be served while the
/// backend is failing or the circuit is open.
pub struct ResilientQuestionBank<B> {
    inner: Arc<B>,
    breaker: CircuitBreaker,
    competencies: Cache<CompetencyId, Competency>,
    competency_lists: Cache<bool, Vec<Competency>>,
}

impl<B> ResilientQuestionBank<B>
where
    B: QuestionBank,
{
    pub fn new(
        inner: Arc<B>,
        config: BreakerConfig,
        cache_capacity: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new("question bank", config, clock),
            competencies: Cache::builder().max_capacity(cache_capacity).build(),
            competency_lists: Cache::builder().max_capacity(2).build(),
        }
    }

    pub fn breaker_status(&self) -> BreakerStatus {
        self.breaker.status()
    }

    fn fallback<K, V>(
        &self,
        cache: &Cache<K, V>,
        key: &K,
        error: LookupError,
    ) -> Result<V, LookupError>
    where
        K: std::hash::Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match cache.get(key) {
            Some(value) => {
                warn!(%error, "question bank degraded; serving cached competency data");
                Ok(value)
            }
            None => Err(error),
        }
    }
}

impl<B> QuestionBank for ResilientQuestionBank<B>
where
    B: QuestionBank,
{
    fn competency(&self, id: &CompetencyId) -> Result<Option<Competency>, LookupError> {
        match self.breaker.call(|| self.inner.competency(id)) {
            Ok(found) => {
                if let Some(competency) = &found {
                    self.competencies.insert(id.clone(), competency.clone());
                }
                Ok(found)
            }
            Err(error) => self.fallback(&self.competencies, id, error).map(Some),
        }
    }

    fn competencies(&self, active_only: bool) -> Result<Vec<Competency>, LookupError> {
        match self.breaker.call(|| self.inner.competencies(active_only)) {
            Ok(found) => {
                for competency in &found {
                    self.competencies
                        .insert(competency.id.clone(), competency.clone());
                }
                self.competency_lists.insert(active_only, found.clone());
                Ok(found)
            }
            Err(error) => self.fallback(&self.competency_lists, &active_only, error),
        }
    }

    fn indicator(&self, id: &IndicatorId) -> Result<Option<BehavioralIndicator>, LookupError> {
        self.breaker.call(|| self.inner.indicator(id))
    }

    fn indicators_for_competency(
        &self,
        id: &CompetencyId,
        active_only: bool,
    ) -> Result<Vec<BehavioralIndicator>, LookupError> {
        self.breaker
            .call(|| self.inner.indicators_for_competency(id, active_only))
    }

    fn question(&self, id: &QuestionId) -> Result<Option<Question>, LookupError> {
        self.breaker.call(|| self.inner.question(id))
    }

    fn questions_for_indicator(
        &self,
        id: &IndicatorId,
        active_only: bool,
    ) -> Result<Vec<Question>, LookupError> {
        self.breaker
            .call(|| self.inner.questions_for_indicator(id, active_only))
    }
}
