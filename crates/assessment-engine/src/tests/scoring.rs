use super::common::*;
use std::sync::Arc;

use crate::domain::{AssessmentGoal, CompetencyId, QuestionType};
use crate::scoring::{ScoringEngine, ScoringStrategy, StrategySelection};

fn weighted_answers() -> Vec<crate::domain::Answer> {
    vec![
        likert_answer(likert("q-clarity-1", "ind-comm-clarity", COMMUNICATION), 5, 12),
        likert_answer(likert("q-clarity-2", "ind-comm-clarity", COMMUNICATION), 5, 15),
        likert_answer(likert("q-listen-1", "ind-comm-listening", COMMUNICATION), 1, 9),
    ]
}

#[test]
fn goal_strategy_weights_indicators() {
    let engine = ScoringEngine::new(sample_bank());
    let result = engine.calculate(
        &session(Some(AssessmentGoal::Overview), 70.0),
        &weighted_answers(),
    );

    assert_eq!(
        result.strategy,
        StrategySelection::Goal(ScoringStrategy::Overview)
    );
    assert_eq!(result.competency_scores.len(), 1);
    let communication = &result.competency_scores[0];
    assert_eq!(communication.competency_name, "Communication");
    assert_eq!(communication.standard_code.as_deref(), Some("2.A.1.d"));
    assert_eq!(communication.questions_answered, 3);
    assert!((communication.percentage - 200.0 / 3.0).abs() < 1e-9);
    assert!((communication.score - 4.0).abs() < 1e-9);
    assert!((communication.max_score - 5.0).abs() < 1e-9);

    assert!((result.overall_percentage - 80.0).abs() < 1e-9);
    assert!(result.passed);
}

#[test]
fn legacy_scoring_ignores_indicator_weights() {
    let engine = ScoringEngine::new(sample_bank());
    let result = engine.calculate(&session(None, 70.0), &weighted_answers());

    assert_eq!(result.strategy, StrategySelection::Legacy);
    let communication = &result.competency_scores[0];
    assert!((communication.percentage - 50.0).abs() < 1e-9);
    assert!((result.overall_percentage - 200.0 / 3.0).abs() < 1e-9);
    assert!(!result.passed);
}

#[test]
fn every_goal_scores_the_same_pipeline() {
    let engine = ScoringEngine::new(sample_bank());
    let answers = weighted_answers();
    let percentages: Vec<f64> = [
        AssessmentGoal::Overview,
        AssessmentGoal::JobFit,
        AssessmentGoal::TeamFit,
    ]
    .into_iter()
    .map(|goal| engine.calculate(&session(Some(goal), 50.0), &answers).overall_percentage)
    .collect();
    assert!(percentages.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn passing_threshold_tolerates_float_noise() {
    let engine = ScoringEngine::new(sample_bank());
    let answers = vec![
        scored_answer(sjt("q-sjt-1", "ind-crit-analysis", CRITICAL_THINKING), 0.7),
        scored_answer(sjt("q-sjt-2", "ind-crit-analysis", CRITICAL_THINKING), 0.7),
        scored_answer(sjt("q-sjt-3", "ind-crit-analysis", CRITICAL_THINKING), 0.7),
    ];
    let result = engine.calculate(&session(Some(AssessmentGoal::JobFit), 70.0), &answers);
    assert!(result.passed);
}

#[test]
fn skipped_and_unknown_answers_count_as_zero() {
    let engine = ScoringEngine::new(sample_bank());
    let mut skipped = likert_answer(likert("q-lead-1", "ind-lead-delegation", LEADERSHIP), 5, 10);
    skipped.skipped = true;
    let unknown = likert_answer(
        question(
            "q-lead-2",
            "ind-lead-delegation",
            LEADERSHIP,
            QuestionType::Unknown,
            crate::domain::DifficultyLevel::Foundational,
        ),
        5,
        10,
    );
    let answered = likert_answer(likert("q-lead-3", "ind-lead-delegation", LEADERSHIP), 5, 10);

    let result = engine.calculate(
        &session(Some(AssessmentGoal::TeamFit), 50.0),
        &[skipped, unknown, answered],
    );
    let leadership = &result.competency_scores[0];
    assert_eq!(leadership.questions_answered, 3);
    assert!((leadership.percentage - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn empty_sessions_score_zero_and_fail() {
    let engine = ScoringEngine::new(sample_bank());
    let result = engine.calculate(&session(Some(AssessmentGoal::Overview), 0.5), &[]);
    assert!(result.competency_scores.is_empty());
    assert_eq!(result.overall_percentage, 0.0);
    assert!(!result.passed);
}

#[test]
fn bank_outage_falls_back_to_answer_metadata() {
    let engine = ScoringEngine::new(Arc::new(UnavailableBank));
    let result = engine.calculate(
        &session(Some(AssessmentGoal::Overview), 50.0),
        &weighted_answers(),
    );

    assert_eq!(result.competency_scores.len(), 1);
    let communication = &result.competency_scores[0];
    assert_eq!(communication.competency_id, CompetencyId::new(COMMUNICATION));
    assert_eq!(communication.competency_name, "Unknown competency");
    assert!(communication.indicators.iter().all(|indicator| indicator.weight == 1.0));
    assert!((communication.percentage - 50.0).abs() < 1e-9);
}
