//! Interfaces to the collaborators the pipeline reads from.
//!
//! Persistence lives outside this crate; every store is reached through one of
//! these traits so scoring and assembly can run against in-memory fixtures or a
//! resilient wrapper around a remote backend.

use std::collections::HashMap;

use crate::domain::{
    BehavioralIndicator, Competency, CompetencyId, CompetencyPassport, CompetencyReliability,
    HistoricalStats, IndicatorId, ItemValidityStatus, OccupationBenchmark, Question, QuestionId,
};

/// Failure reported by a lookup backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("lookup backend unavailable: {0}")]
    Unavailable(String),
    #[error("circuit open for {0}; backend calls suspended")]
    CircuitOpen(&'static str),
}

/// Competency, indicator and question reads.
pub trait QuestionBank: Send + Sync {
    fn competency(&self, id: &CompetencyId) -> Result<Option<Competency>, LookupError>;
    fn competencies(&self, active_only: bool) -> Result<Vec<Competency>, LookupError>;
    fn indicator(&self, id: &IndicatorId) -> Result<Option<BehavioralIndicator>, LookupError>;
    fn indicators_for_competency(
        &self,
        id: &CompetencyId,
        active_only: bool,
    ) -> Result<Vec<BehavioralIndicator>, LookupError>;
    fn question(&self, id: &QuestionId) -> Result<Option<Question>, LookupError>;
    fn questions_for_indicator(
        &self,
        id: &IndicatorId,
        active_only: bool,
    ) -> Result<Vec<Question>, LookupError>;
}

/// Batch reliability reads, one call per scoring pass.
pub trait ReliabilityLookup: Send + Sync {
    fn reliabilities(
        &self,
        ids: &[CompetencyId],
    ) -> Result<HashMap<CompetencyId, CompetencyReliability>, LookupError>;
}

/// Historical sample size and spread of completed results per competency.
pub trait ScoreHistoryLookup: Send + Sync {
    fn history(&self, id: &CompetencyId) -> Result<HistoricalStats, LookupError>;
}

/// External occupational benchmark profiles keyed by occupation code.
pub trait BenchmarkLookup: Send + Sync {
    fn benchmark(&self, occupation_code: &str) -> Result<Option<OccupationBenchmark>, LookupError>;
}

/// Prior competency scores keyed by the identity provider's user id.
pub trait PassportLookup: Send + Sync {
    fn passport(&self, external_user_id: &str) -> Result<Option<CompetencyPassport>, LookupError>;
}

/// Recorded item validity status. `None` means no statistics exist yet.
pub trait ItemStatisticsLookup: Send + Sync {
    fn status(&self, id: &QuestionId) -> Result<Option<ItemValidityStatus>, LookupError>;

    fn statuses(
        &self,
        ids: &[QuestionId],
    ) -> Result<HashMap<QuestionId, ItemValidityStatus>, LookupError> {
        let mut statuses = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(status) = self.status(id)? {
                statuses.insert(id.clone(), status);
            }
        }
        Ok(statuses)
    }
}
