use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembly::{
    AssemblyBlueprint, AssemblyError, ItemSelector, JobFitAssembler, JobFitBlueprint, JobFitPlan,
    StandardAssembler, TestAssembler,
};
use crate::config::EngineConfig;
use crate::domain::{Answer, ItemValidityStatus, QuestionId, TestSession};
use crate::lookup::{
    BenchmarkLookup, ItemStatisticsLookup, LookupError, PassportLookup, QuestionBank,
    ReliabilityLookup, ScoreHistoryLookup,
};
use crate::resilience::Clock;
use crate::scoring::{
    ConfidenceIntervalCalculator, ConsistencyResult, ResponseConsistencyAnalyzer, ScoringEngine,
    ScoringResult,
};
use crate::submission::{grade_text_answer, prepare_answer, RawAnswer};

/// Every external store the pipeline reads from.
#[derive(Clone)]
pub struct Collaborators {
    pub bank: Arc<dyn QuestionBank>,
    pub reliability: Arc<dyn ReliabilityLookup>,
    pub history: Arc<dyn ScoreHistoryLookup>,
    pub item_statistics: Arc<dyn ItemStatisticsLookup>,
    pub benchmarks: Arc<dyn BenchmarkLookup>,
    pub passports: Arc<dyn PassportLookup>,
    pub clock: Arc<dyn Clock>,
}

/// Manual rubric grade for a free-text answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextGrade {
    pub points: f64,
    pub max_points: f64,
}

/// Answer as submitted by a client, referencing its question by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    #[serde(flatten)]
    pub response: RawAnswer,
    #[serde(default)]
    pub grade: Option<TextGrade>,
}

/// Outcome of finishing a session: CI-enriched scores plus response quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub scoring: ScoringResult,
    pub consistency: ConsistencyResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEligibility {
    pub question_id: QuestionId,
    /// `None` when no statistics have been recorded for the item.
    pub status: Option<ItemValidityStatus>,
    pub eligible: bool,
}

/// Facade over scoring, consistency analysis and test assembly.
pub struct AssessmentService {
    bank: Arc<dyn QuestionBank>,
    item_statistics: Arc<dyn ItemStatisticsLookup>,
    engine: ScoringEngine,
    confidence: ConfidenceIntervalCalculator,
    consistency: ResponseConsistencyAnalyzer,
    selector: Arc<ItemSelector>,
    standard: StandardAssembler,
    job_fit: JobFitAssembler,
}

impl AssessmentService {
    pub fn new(collaborators: Collaborators, config: &EngineConfig) -> Self {
        let selector = ItemSelector::new(
            collaborators.bank.clone(),
            collaborators.item_statistics.clone(),
            config.selector,
        );
        Self::with_selector(collaborators, selector, config)
    }

    /// Uses a caller-built selector, e.g. a seeded one for reproducible runs.
    pub fn with_selector(
        collaborators: Collaborators,
        selector: ItemSelector,
        config: &EngineConfig,
    ) -> Self {
        let selector = Arc::new(selector);
        let engine = ScoringEngine::new(collaborators.bank.clone());
        let consistency = ResponseConsistencyAnalyzer::new(*engine.normalizer());

        Self {
            confidence: ConfidenceIntervalCalculator::new(
                collaborators.reliability.clone(),
                collaborators.history.clone(),
            ),
            standard: StandardAssembler::new(collaborators.bank.clone(), selector.clone()),
            job_fit: JobFitAssembler::new(
                collaborators.bank.clone(),
                selector.clone(),
                collaborators.benchmarks,
                collaborators.passports,
                collaborators.clock,
                config.job_fit.clone(),
            ),
            bank: collaborators.bank,
            item_statistics: collaborators.item_statistics,
            engine,
            consistency,
            selector,
        }
    }

    /// Resolve submitted answers against the bank and derive their scores.
    pub fn prepare_answers(
        &self,
        submitted: Vec<SubmittedAnswer>,
    ) -> Result<Vec<Answer>, ServiceError> {
        submitted
            .into_iter()
            .map(|answer| {
                let question = self
                    .bank
                    .question(&answer.question_id)?
                    .ok_or_else(|| ServiceError::UnknownQuestion(answer.question_id.clone()))?;
                let prepared = prepare_answer(question, answer.response);
                Ok(match answer.grade {
                    Some(grade) => grade_text_answer(prepared, grade.points, grade.max_points),
                    None => prepared,
                })
            })
            .collect()
    }

    /// Score a session with its goal strategy and attach confidence intervals.
    pub fn score(&self, session: &TestSession, answers: &[Answer]) -> ScoringResult {
        let mut result = self.engine.calculate(session, answers);
        result.competency_scores = self
            .confidence
            .enrich_with_confidence_intervals(&result.competency_scores);
        result
    }

    pub fn analyze(&self, answers: &[Answer]) -> ConsistencyResult {
        self.consistency.analyze(answers)
    }

    pub fn complete_session(&self, session: &TestSession, answers: &[Answer]) -> SessionReport {
        let scoring = self.score(session, answers);
        let consistency = self.analyze(answers);
        info!(
            session_id = session.id.as_str(),
            strategy = scoring.strategy.label(),
            overall_percentage = scoring.overall_percentage,
            passed = scoring.passed,
            consistency_score = consistency.consistency_score,
            flags = consistency.flags.len(),
            "session completed"
        );
        SessionReport {
            session_id: session.id.clone(),
            scoring,
            consistency,
        }
    }

    /// Hand the blueprint to the assembler that owns its variant.
    pub fn assemble(&self, blueprint: &AssemblyBlueprint) -> Result<Vec<QuestionId>, ServiceError> {
        let assembler: &dyn TestAssembler = match blueprint {
            AssemblyBlueprint::Standard(_) => &self.standard,
            AssemblyBlueprint::JobFit(_) => &self.job_fit,
        };
        let questions = assembler.assemble(blueprint)?;
        debug!(
            kind = blueprint.kind(),
            questions = questions.len(),
            "assembly complete"
        );
        Ok(questions)
    }

    pub fn plan_job_fit(&self, blueprint: &JobFitBlueprint) -> Result<JobFitPlan, ServiceError> {
        Ok(self.job_fit.plan(blueprint)?)
    }

    pub fn eligibility(&self, question_id: &QuestionId) -> Result<ItemEligibility, ServiceError> {
        if self.bank.question(question_id)?.is_none() {
            return Err(ServiceError::UnknownQuestion(question_id.clone()));
        }
        let status = self.item_statistics.status(question_id)?;
        Ok(ItemEligibility {
            question_id: question_id.clone(),
            status,
            eligible: self.selector.is_eligible_for_assembly(question_id),
        })
    }
}

/// Error raised by the assessment service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("question {0} does not exist")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ServiceError {
    /// Whether the failure came from an unavailable collaborator.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ServiceError::Lookup(_) | ServiceError::Assembly(AssemblyError::Lookup(_))
        )
    }
}
