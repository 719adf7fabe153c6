use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::aggregation::{CompetencyAggregation, CompetencyScore, IndicatorAggregation};
use super::normalizer::ScoreNormalizer;
use super::precision::meets_threshold;
use crate::domain::{
    Answer, AssessmentGoal, BehavioralIndicator, Competency, CompetencyId, IndicatorId,
    TestSession, TestTemplate,
};
use crate::lookup::QuestionBank;

/// Goal-specific scoring strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    Overview,
    JobFit,
    TeamFit,
}

const STRATEGY_TABLE: [(AssessmentGoal, ScoringStrategy); 3] = [
    (AssessmentGoal::Overview, ScoringStrategy::Overview),
    (AssessmentGoal::JobFit, ScoringStrategy::JobFit),
    (AssessmentGoal::TeamFit, ScoringStrategy::TeamFit),
];

/// Outcome of strategy selection. `Legacy` covers templates that predate
/// assessment goals and scores with unit indicator weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategySelection {
    Goal(ScoringStrategy),
    Legacy,
}

impl StrategySelection {
    pub fn for_template(template: &TestTemplate) -> Self {
        template
            .goal
            .and_then(ScoringStrategy::for_goal)
            .map(StrategySelection::Goal)
            .unwrap_or(StrategySelection::Legacy)
    }

    pub const fn label(self) -> &'static str {
        match self {
            StrategySelection::Goal(strategy) => strategy.goal().label(),
            StrategySelection::Legacy => "legacy",
        }
    }
}

impl ScoringStrategy {
    pub fn for_goal(goal: AssessmentGoal) -> Option<Self> {
        STRATEGY_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == goal)
            .map(|(_, strategy)| *strategy)
    }

    pub const fn goal(self) -> AssessmentGoal {
        match self {
            ScoringStrategy::Overview => AssessmentGoal::Overview,
            ScoringStrategy::JobFit => AssessmentGoal::JobFit,
            ScoringStrategy::TeamFit => AssessmentGoal::TeamFit,
        }
    }

    pub fn calculate(
        self,
        bank: &dyn QuestionBank,
        normalizer: &ScoreNormalizer,
        session: &TestSession,
        answers: &[Answer],
    ) -> ScoringResult {
        let competencies = aggregate(bank, normalizer, answers, Rollup::IndicatorWeighted);
        ScoringResult::from_competencies(
            StrategySelection::Goal(self),
            &session.template,
            competencies,
        )
    }
}

/// Legacy path: answers grouped by their question's competency, unit weights.
pub fn calculate_legacy(
    bank: &dyn QuestionBank,
    normalizer: &ScoreNormalizer,
    session: &TestSession,
    answers: &[Answer],
) -> ScoringResult {
    let competencies = aggregate(bank, normalizer, answers, Rollup::Uniform);
    ScoringResult::from_competencies(StrategySelection::Legacy, &session.template, competencies)
}

/// Aggregate produced by a scoring run, ready for persistence by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub strategy: StrategySelection,
    pub overall_score: f64,
    pub overall_max_score: f64,
    pub overall_percentage: f64,
    pub passed: bool,
    pub competency_scores: Vec<CompetencyScore>,
}

impl ScoringResult {
    fn from_competencies(
        strategy: StrategySelection,
        template: &TestTemplate,
        competency_scores: Vec<CompetencyScore>,
    ) -> Self {
        let overall_score: f64 = competency_scores.iter().map(|score| score.score).sum();
        let overall_max_score: f64 = competency_scores.iter().map(|score| score.max_score).sum();
        let overall_percentage = if overall_max_score > 0.0 {
            overall_score / overall_max_score * 100.0
        } else {
            0.0
        };
        let passed = meets_threshold(overall_percentage, template.passing_score);

        debug!(
            strategy = strategy.label(),
            competencies = competency_scores.len(),
            overall_percentage,
            passed,
            "session scored"
        );

        Self {
            strategy,
            overall_score,
            overall_max_score,
            overall_percentage,
            passed,
            competency_scores,
        }
    }
}

/// Dispatches a session to the strategy matching its template goal.
#[derive(Clone)]
pub struct ScoringEngine {
    bank: Arc<dyn QuestionBank>,
    normalizer: ScoreNormalizer,
}

impl ScoringEngine {
    pub fn new(bank: Arc<dyn QuestionBank>) -> Self {
        Self {
            bank,
            normalizer: ScoreNormalizer,
        }
    }

    pub fn normalizer(&self) -> &ScoreNormalizer {
        &self.normalizer
    }

    pub fn calculate(&self, session: &TestSession, answers: &[Answer]) -> ScoringResult {
        match StrategySelection::for_template(&session.template) {
            StrategySelection::Goal(strategy) => {
                strategy.calculate(self.bank.as_ref(), &self.normalizer, session, answers)
            }
            StrategySelection::Legacy => {
                debug!(session_id = %session.id, "template has no goal; using legacy scoring");
                calculate_legacy(self.bank.as_ref(), &self.normalizer, session, answers)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rollup {
    IndicatorWeighted,
    Uniform,
}

struct IndicatorBucket {
    competency_id: CompetencyId,
    aggregation: IndicatorAggregation,
}

fn aggregate(
    bank: &dyn QuestionBank,
    normalizer: &ScoreNormalizer,
    answers: &[Answer],
    rollup: Rollup,
) -> Vec<CompetencyScore> {
    let mut buckets: BTreeMap<IndicatorId, IndicatorBucket> = BTreeMap::new();

    for answer in answers {
        let normalized = normalizer.normalize(Some(answer));
        let bucket = buckets
            .entry(answer.indicator_id().clone())
            .or_insert_with(|| {
                let indicator = load_indicator(bank, answer.indicator_id());
                let competency_id = match (&indicator, rollup) {
                    (Some(indicator), Rollup::IndicatorWeighted) => indicator.competency_id.clone(),
                    _ => answer.competency_id().clone(),
                };
                IndicatorBucket {
                    competency_id,
                    aggregation: IndicatorAggregation::new(
                        answer.indicator_id().clone(),
                        indicator.as_ref(),
                    ),
                }
            });
        bucket.aggregation.add_answer(normalized);
    }

    let mut competencies: BTreeMap<CompetencyId, CompetencyAggregation> = BTreeMap::new();
    for (_, bucket) in buckets {
        let aggregation = competencies
            .entry(bucket.competency_id.clone())
            .or_insert_with(|| {
                let competency = load_competency(bank, &bucket.competency_id);
                CompetencyAggregation::new(bucket.competency_id.clone(), competency.as_ref())
            });
        let indicator = bucket.aggregation.finish();
        match rollup {
            Rollup::IndicatorWeighted => aggregation.add_indicator(indicator),
            Rollup::Uniform => aggregation.add_indicator_with_weight(indicator, 1.0),
        }
    }

    competencies
        .into_values()
        .map(CompetencyAggregation::finish)
        .collect()
}

fn load_indicator(bank: &dyn QuestionBank, id: &IndicatorId) -> Option<BehavioralIndicator> {
    bank.indicator(id).unwrap_or_else(|error| {
        warn!(indicator_id = %id, %error, "indicator lookup failed; using defaults");
        None
    })
}

fn load_competency(bank: &dyn QuestionBank, id: &CompetencyId) -> Option<Competency> {
    bank.competency(id).unwrap_or_else(|error| {
        warn!(competency_id = %id, %error, "competency lookup failed; using defaults");
        None
    })
}
