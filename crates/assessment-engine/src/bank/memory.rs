use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use crate::domain::{
    BehavioralIndicator, Competency, CompetencyId, CompetencyPassport, CompetencyReliability,
    HistoricalStats, IndicatorId, ItemValidityStatus, OccupationBenchmark, Question, QuestionId,
};
use crate::lookup::{
    BenchmarkLookup, ItemStatisticsLookup, LookupError, PassportLookup, QuestionBank,
    ReliabilityLookup, ScoreHistoryLookup,
};

fn read<'a, T>(lock: &'a RwLock<T>, store: &str) -> Result<RwLockReadGuard<'a, T>, LookupError> {
    lock.read()
        .map_err(|_| LookupError::Unavailable(format!("{store} lock poisoned")))
}

#[derive(Debug, Default)]
struct BankState {
    competencies: BTreeMap<CompetencyId, Competency>,
    indicators: BTreeMap<IndicatorId, BehavioralIndicator>,
    questions: BTreeMap<QuestionId, Question>,
}

/// Thread-safe question bank held entirely in memory. Iteration order is the
/// identifier order so selections over it are reproducible.
#[derive(Debug, Default)]
pub struct InMemoryQuestionBank {
    state: RwLock<BankState>,
}

impl InMemoryQuestionBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_competency(&self, competency: Competency) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.competencies.insert(competency.id.clone(), competency);
    }

    pub fn insert_indicator(&self, indicator: BehavioralIndicator) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.indicators.insert(indicator.id.clone(), indicator);
    }

    pub fn insert_question(&self, question: Question) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.questions.insert(question.id.clone(), question);
    }

    pub fn question_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .questions
            .len()
    }
}

impl QuestionBank for InMemoryQuestionBank {
    fn competency(&self, id: &CompetencyId) -> Result<Option<Competency>, LookupError> {
        Ok(read(&self.state, "question bank")?.competencies.get(id).cloned())
    }

    fn competencies(&self, active_only: bool) -> Result<Vec<Competency>, LookupError> {
        Ok(read(&self.state, "question bank")?
            .competencies
            .values()
            .filter(|competency| !active_only || competency.active)
            .cloned()
            .collect())
    }

    fn indicator(&self, id: &IndicatorId) -> Result<Option<BehavioralIndicator>, LookupError> {
        Ok(read(&self.state, "question bank")?.indicators.get(id).cloned())
    }

    fn indicators_for_competency(
        &self,
        id: &CompetencyId,
        active_only: bool,
    ) -> Result<Vec<BehavioralIndicator>, LookupError> {
        Ok(read(&self.state, "question bank")?
            .indicators
            .values()
            .filter(|indicator| &indicator.competency_id == id)
            .filter(|indicator| !active_only || indicator.active)
            .cloned()
            .collect())
    }

    fn question(&self, id: &QuestionId) -> Result<Option<Question>, LookupError> {
        Ok(read(&self.state, "question bank")?.questions.get(id).cloned())
    }

    fn questions_for_indicator(
        &self,
        id: &IndicatorId,
        active_only: bool,
    ) -> Result<Vec<Question>, LookupError> {
        Ok(read(&self.state, "question bank")?
            .questions
            .values()
            .filter(|question| &question.indicator_id == id)
            .filter(|question| !active_only || question.active)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct PsychometricState {
    reliabilities: HashMap<CompetencyId, CompetencyReliability>,
    history: HashMap<CompetencyId, HistoricalStats>,
    statuses: HashMap<QuestionId, ItemValidityStatus>,
}

/// Reliability, score-history and item-status records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPsychometrics {
    state: RwLock<PsychometricState>,
}

impl InMemoryPsychometrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reliability(&self, id: CompetencyId, cronbach_alpha: f64) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .reliabilities
            .insert(id, CompetencyReliability { cronbach_alpha });
    }

    pub fn set_history(&self, id: CompetencyId, stats: HistoricalStats) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.history.insert(id, stats);
    }

    pub fn set_status(&self, id: QuestionId, status: ItemValidityStatus) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.statuses.insert(id, status);
    }
}

impl ReliabilityLookup for InMemoryPsychometrics {
    fn reliabilities(
        &self,
        ids: &[CompetencyId],
    ) -> Result<HashMap<CompetencyId, CompetencyReliability>, LookupError> {
        let state = read(&self.state, "psychometrics")?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .reliabilities
                    .get(id)
                    .map(|reliability| (id.clone(), *reliability))
            })
            .collect())
    }
}

impl ScoreHistoryLookup for InMemoryPsychometrics {
    fn history(&self, id: &CompetencyId) -> Result<HistoricalStats, LookupError> {
        Ok(read(&self.state, "psychometrics")?
            .history
            .get(id)
            .copied()
            .unwrap_or_default())
    }
}

impl ItemStatisticsLookup for InMemoryPsychometrics {
    fn status(&self, id: &QuestionId) -> Result<Option<ItemValidityStatus>, LookupError> {
        Ok(read(&self.state, "psychometrics")?.statuses.get(id).copied())
    }
}

/// Occupational benchmarks keyed by occupation code.
#[derive(Debug, Default)]
pub struct InMemoryBenchmarks {
    profiles: RwLock<HashMap<String, OccupationBenchmark>>,
}

impl InMemoryBenchmarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, benchmark: OccupationBenchmark) {
        let mut profiles = self.profiles.write().unwrap_or_else(PoisonError::into_inner);
        profiles.insert(benchmark.occupation_code.clone(), benchmark);
    }
}

impl BenchmarkLookup for InMemoryBenchmarks {
    fn benchmark(&self, occupation_code: &str) -> Result<Option<OccupationBenchmark>, LookupError> {
        Ok(read(&self.profiles, "benchmarks")?
            .get(occupation_code.trim())
            .cloned())
    }
}

/// Candidate passports keyed by external user id.
#[derive(Debug, Default)]
pub struct InMemoryPassports {
    passports: RwLock<HashMap<String, CompetencyPassport>>,
}

impl InMemoryPassports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, external_user_id: impl Into<String>, passport: CompetencyPassport) {
        let mut passports = self.passports.write().unwrap_or_else(PoisonError::into_inner);
        passports.insert(external_user_id.into(), passport);
    }
}

impl PassportLookup for InMemoryPassports {
    fn passport(&self, external_user_id: &str) -> Result<Option<CompetencyPassport>, LookupError> {
        Ok(read(&self.passports, "passports")?
            .get(external_user_id)
            .cloned())
    }
}
