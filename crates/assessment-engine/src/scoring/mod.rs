//! Scoring pipeline: normalization, indicator and competency roll-up,
//! goal-specific strategies, confidence intervals and response consistency.

pub mod aggregation;
pub mod confidence;
pub mod consistency;
pub mod normalizer;
pub mod precision;
pub mod strategy;

pub use aggregation::{
    CompetencyAggregation, CompetencyScore, ConfidenceInterval, IndicatorAggregation,
    IndicatorScore,
};
pub use confidence::ConfidenceIntervalCalculator;
pub use consistency::{ConsistencyResult, ResponseConsistencyAnalyzer};
pub use normalizer::ScoreNormalizer;
pub use precision::{meets_threshold, round4};
pub use strategy::{ScoringEngine, ScoringResult, ScoringStrategy, StrategySelection};
