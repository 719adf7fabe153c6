use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::assembly::{ItemSelector, SelectorConfig};
use crate::bank::{
    InMemoryBenchmarks, InMemoryPassports, InMemoryPsychometrics, InMemoryQuestionBank,
};
use crate::config::EngineConfig;
use crate::domain::{
    Answer, AnswerOption, AssessmentGoal, BehavioralIndicator, Competency, CompetencyId,
    CompetencyPassport, DifficultyLevel, IndicatorId, ItemValidityStatus, OccupationBenchmark,
    Question, QuestionId, QuestionType, TestSession, TestTemplate,
};
use crate::lookup::{ItemStatisticsLookup, LookupError, QuestionBank};
use crate::resilience::ManualClock;
use crate::service::{AssessmentService, Collaborators};

pub(super) const COMMUNICATION: &str = "comp-communication";
pub(super) const CRITICAL_THINKING: &str = "comp-critical-thinking";
pub(super) const LEADERSHIP: &str = "comp-leadership";
pub(super) const SOFTWARE_DEVELOPERS: &str = "15-1252.00";
pub(super) const SELECTOR_SEED: u64 = 7;

const LEVELS: [DifficultyLevel; 4] = [
    DifficultyLevel::Foundational,
    DifficultyLevel::Intermediate,
    DifficultyLevel::Advanced,
    DifficultyLevel::Expert,
];

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn competency(
    id: &str,
    name: &str,
    code: Option<&str>,
    title: Option<&str>,
) -> Competency {
    Competency {
        id: CompetencyId::new(id),
        name: name.to_string(),
        standard_code: code.map(str::to_string),
        standard_title: title.map(str::to_string),
        active: true,
    }
}

pub(super) fn indicator(id: &str, competency_id: &str, weight: f64) -> BehavioralIndicator {
    BehavioralIndicator {
        id: IndicatorId::new(id),
        competency_id: CompetencyId::new(competency_id),
        title: format!("Indicator {id}"),
        weight,
        active: true,
    }
}

pub(super) fn question(
    id: &str,
    indicator_id: &str,
    competency_id: &str,
    question_type: QuestionType,
    difficulty: DifficultyLevel,
) -> Question {
    Question {
        id: QuestionId::new(id),
        indicator_id: IndicatorId::new(indicator_id),
        competency_id: CompetencyId::new(competency_id),
        question_type,
        text: format!("Question {id}"),
        options: Vec::new(),
        difficulty,
        active: true,
    }
}

pub(super) fn likert(id: &str, indicator_id: &str, competency_id: &str) -> Question {
    question(
        id,
        indicator_id,
        competency_id,
        QuestionType::Likert,
        DifficultyLevel::Intermediate,
    )
}

pub(super) fn sjt(id: &str, indicator_id: &str, competency_id: &str) -> Question {
    let mut question = question(
        id,
        indicator_id,
        competency_id,
        QuestionType::Sjt,
        DifficultyLevel::Advanced,
    );
    question.options = vec![
        option("a", Some(4.0)),
        option("b", Some(2.0)),
        option("c", Some(0.0)),
    ];
    question
}

pub(super) fn option(id: &str, score: Option<f64>) -> AnswerOption {
    AnswerOption {
        id: id.to_string(),
        text: format!("Option {id}"),
        score,
    }
}

/// Answer with a Likert value, answered `seconds` after being shown.
pub(super) fn likert_answer(question: Question, value: i32, seconds: u32) -> Answer {
    let mut answer = Answer::blank(question);
    answer.likert_value = Some(value);
    answer.time_spent_seconds = Some(seconds);
    answer.answered_at = Some(now());
    answer
}

pub(super) fn scored_answer(question: Question, score: f64) -> Answer {
    let mut answer = Answer::blank(question);
    answer.score = Some(score);
    answer.time_spent_seconds = Some(20);
    answer.answered_at = Some(now());
    answer
}

pub(super) fn template(goal: Option<AssessmentGoal>, passing_score: f64) -> TestTemplate {
    TestTemplate {
        id: "tpl-graduate-screen".to_string(),
        name: "Graduate screen".to_string(),
        goal,
        passing_score,
    }
}

pub(super) fn session(goal: Option<AssessmentGoal>, passing_score: f64) -> TestSession {
    TestSession {
        id: "session-0001".to_string(),
        template: template(goal, passing_score),
        candidate_id: Some("user_2f9a".to_string()),
    }
}

/// Adds `per_level` questions at every difficulty to an indicator.
pub(super) fn seed_indicator_questions(
    bank: &InMemoryQuestionBank,
    indicator_id: &str,
    competency_id: &str,
    per_level: usize,
) -> Vec<QuestionId> {
    let mut ids = Vec::new();
    for level in LEVELS {
        for n in 0..per_level {
            let id = format!("q-{indicator_id}-{}-{n}", level.label());
            bank.insert_question(question(
                &id,
                indicator_id,
                competency_id,
                QuestionType::Likert,
                level,
            ));
            ids.push(QuestionId::new(id));
        }
    }
    ids
}

/// Three competencies: communication (two indicators, weights 2 and 1),
/// critical thinking and team leadership (one indicator each). Every indicator
/// carries two questions per difficulty level.
pub(super) fn sample_bank() -> Arc<InMemoryQuestionBank> {
    let bank = InMemoryQuestionBank::new();
    bank.insert_competency(competency(
        COMMUNICATION,
        "Communication",
        Some("2.A.1.d"),
        Some("Speaking"),
    ));
    bank.insert_competency(competency(
        CRITICAL_THINKING,
        "Critical Thinking",
        Some("2.A.2.a"),
        None,
    ));
    bank.insert_competency(competency(LEADERSHIP, "Team Leadership", None, None));

    for (indicator_id, competency_id, weight) in [
        ("ind-comm-clarity", COMMUNICATION, 2.0),
        ("ind-comm-listening", COMMUNICATION, 1.0),
        ("ind-crit-analysis", CRITICAL_THINKING, 1.0),
        ("ind-lead-delegation", LEADERSHIP, 1.0),
    ] {
        bank.insert_indicator(indicator(indicator_id, competency_id, weight));
        seed_indicator_questions(&bank, indicator_id, competency_id, 2);
    }
    Arc::new(bank)
}

/// One competency with `indicators` indicators of `per_level` questions per level.
pub(super) fn wide_bank(indicators: usize, per_level: usize) -> Arc<InMemoryQuestionBank> {
    let bank = InMemoryQuestionBank::new();
    bank.insert_competency(competency("comp-programming", "Programming", Some("2.B.3.e"), None));
    for n in 0..indicators {
        let indicator_id = format!("ind-prog-{n:02}");
        bank.insert_indicator(indicator(&indicator_id, "comp-programming", 1.0));
        seed_indicator_questions(&bank, &indicator_id, "comp-programming", per_level);
    }
    Arc::new(bank)
}

pub(super) fn benchmark(code: &str, targets: &[(&str, f64)]) -> OccupationBenchmark {
    OccupationBenchmark {
        occupation_code: code.to_string(),
        title: "Software Developers".to_string(),
        competency_targets: targets
            .iter()
            .map(|(name, target)| (name.to_string(), *target))
            .collect(),
    }
}

pub(super) fn passport(scores: &[(&str, f64)], age_days: i64) -> CompetencyPassport {
    CompetencyPassport {
        scores: scores
            .iter()
            .map(|(id, score)| (CompetencyId::new(*id), *score))
            .collect::<BTreeMap<_, _>>(),
        last_assessed: now() - Duration::days(age_days),
    }
}

/// In-memory collaborators plus a manual clock.
pub(super) struct Fixture {
    pub bank: Arc<InMemoryQuestionBank>,
    pub psychometrics: Arc<InMemoryPsychometrics>,
    pub benchmarks: Arc<InMemoryBenchmarks>,
    pub passports: Arc<InMemoryPassports>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_bank(sample_bank())
    }

    pub fn with_bank(bank: Arc<InMemoryQuestionBank>) -> Self {
        Self {
            bank,
            psychometrics: Arc::new(InMemoryPsychometrics::new()),
            benchmarks: Arc::new(InMemoryBenchmarks::new()),
            passports: Arc::new(InMemoryPassports::new()),
            clock: Arc::new(ManualClock::new(now())),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            bank: self.bank.clone(),
            reliability: self.psychometrics.clone(),
            history: self.psychometrics.clone(),
            item_statistics: self.psychometrics.clone(),
            benchmarks: self.benchmarks.clone(),
            passports: self.passports.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn selector(&self, config: SelectorConfig, seed: u64) -> ItemSelector {
        ItemSelector::with_seed(self.bank.clone(), self.psychometrics.clone(), config, seed)
    }

    pub fn set_statuses(&self, ids: &[QuestionId], status: ItemValidityStatus) {
        for id in ids {
            self.psychometrics.set_status(id.clone(), status);
        }
    }

    pub fn service(&self) -> AssessmentService {
        let config = EngineConfig::default();
        AssessmentService::with_selector(
            self.collaborators(),
            self.selector(config.selector, SELECTOR_SEED),
            &config,
        )
    }
}

pub(super) fn question_ids(bank: &InMemoryQuestionBank, indicator_id: &str) -> Vec<QuestionId> {
    bank.questions_for_indicator(&IndicatorId::new(indicator_id), true)
        .expect("in-memory bank reads")
        .into_iter()
        .map(|question| question.id)
        .collect()
}

/// Question bank whose reads all fail.
pub(super) struct UnavailableBank;

impl UnavailableBank {
    fn error() -> LookupError {
        LookupError::Unavailable("connection refused".to_string())
    }
}

impl QuestionBank for UnavailableBank {
    fn competency(&self, _: &CompetencyId) -> Result<Option<Competency>, LookupError> {
        Err(Self::error())
    }

    fn competencies(&self, _: bool) -> Result<Vec<Competency>, LookupError> {
        Err(Self::error())
    }

    fn indicator(&self, _: &IndicatorId) -> Result<Option<BehavioralIndicator>, LookupError> {
        Err(Self::error())
    }

    fn indicators_for_competency(
        &self,
        _: &CompetencyId,
        _: bool,
    ) -> Result<Vec<BehavioralIndicator>, LookupError> {
        Err(Self::error())
    }

    fn question(&self, _: &QuestionId) -> Result<Option<Question>, LookupError> {
        Err(Self::error())
    }

    fn questions_for_indicator(
        &self,
        _: &IndicatorId,
        _: bool,
    ) -> Result<Vec<Question>, LookupError> {
        Err(Self::error())
    }
}

/// Wraps a bank, failing on demand and counting backend calls.
pub(super) struct FlakyBank {
    inner: Arc<InMemoryQuestionBank>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyBank {
    pub fn new(inner: Arc<InMemoryQuestionBank>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<(), LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(LookupError::Unavailable("backend timeout".to_string()))
        } else {
            Ok(())
        }
    }
}

impl QuestionBank for FlakyBank {
    fn competency(&self, id: &CompetencyId) -> Result<Option<Competency>, LookupError> {
        self.guard()?;
        self.inner.competency(id)
    }

    fn competencies(&self, active_only: bool) -> Result<Vec<Competency>, LookupError> {
        self.guard()?;
        self.inner.competencies(active_only)
    }

    fn indicator(&self, id: &IndicatorId) -> Result<Option<BehavioralIndicator>, LookupError> {
        self.guard()?;
        self.inner.indicator(id)
    }

    fn indicators_for_competency(
        &self,
        id: &CompetencyId,
        active_only: bool,
    ) -> Result<Vec<BehavioralIndicator>, LookupError> {
        self.guard()?;
        self.inner.indicators_for_competency(id, active_only)
    }

    fn question(&self, id: &QuestionId) -> Result<Option<Question>, LookupError> {
        self.guard()?;
        self.inner.question(id)
    }

    fn questions_for_indicator(
        &self,
        id: &IndicatorId,
        active_only: bool,
    ) -> Result<Vec<Question>, LookupError> {
        self.guard()?;
        self.inner.questions_for_indicator(id, active_only)
    }
}

/// Item statistics store that is always down.
pub(super) struct UnavailableStatistics;

impl ItemStatisticsLookup for UnavailableStatistics {
    fn status(&self, _: &QuestionId) -> Result<Option<ItemValidityStatus>, LookupError> {
        Err(LookupError::Unavailable("statistics replica lagging".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
