//! Response-pattern checks over a completed session.
//!
//! Three signals feed a composite 0-1 consistency score: answers submitted too
//! quickly, repeated identical Likert values, and how much normalized scores
//! vary within each competency. Flags are advisory and use their own
//! thresholds; they never affect scoring.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::normalizer::ScoreNormalizer;
use super::precision::round_to;
use crate::domain::{Answer, CompetencyId};

/// Answers faster than this many seconds count as speed anomalies.
pub const SPEED_THRESHOLD_SECONDS: u32 = 3;
/// Competencies with fewer answers are left out of the variance average.
pub const MIN_ANSWERS_FOR_VARIANCE: usize = 3;

const NORMAL_VARIANCE_LOW: f64 = 0.05;
const NORMAL_VARIANCE_HIGH: f64 = 0.4;
const RANDOM_VARIANCE_CEILING: f64 = 1.0;
const NEUTRAL_VARIANCE_FACTOR: f64 = 0.7;

const SPEED_WEIGHT: f64 = 0.3;
const STRAIGHT_LINING_WEIGHT: f64 = 0.3;
const VARIANCE_WEIGHT: f64 = 0.4;

const SPEED_FLAG_RATE: f64 = 0.2;
const STRAIGHT_LINING_FLAG_RATE: f64 = 0.70;
const LOW_VARIANCE_FLAG: f64 = 0.02;
const HIGH_VARIANCE_FLAG: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyResult {
    pub consistency_score: f64,
    pub flags: Vec<String>,
    pub speed_anomaly_rate: f64,
    pub straight_lining_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intra_competency_variance: Option<f64>,
}

impl ConsistencyResult {
    fn perfect() -> Self {
        Self {
            consistency_score: 1.0,
            flags: Vec::new(),
            speed_anomaly_rate: 0.0,
            straight_lining_rate: 0.0,
            intra_competency_variance: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseConsistencyAnalyzer {
    normalizer: ScoreNormalizer,
}

impl ResponseConsistencyAnalyzer {
    pub fn new(normalizer: ScoreNormalizer) -> Self {
        Self { normalizer }
    }

    pub fn analyze(&self, answers: &[Answer]) -> ConsistencyResult {
        if answers.is_empty() {
            return ConsistencyResult::perfect();
        }

        let speed = speed_anomalies(answers);
        let straight_lining_rate = straight_lining_rate(answers);
        let variance = self.average_intra_competency_variance(answers);
        let factor = variance.map(variance_factor).unwrap_or(NEUTRAL_VARIANCE_FACTOR);

        let composite = SPEED_WEIGHT * (1.0 - speed.rate)
            + STRAIGHT_LINING_WEIGHT * (1.0 - straight_lining_rate)
            + VARIANCE_WEIGHT * factor;

        let mut flags = Vec::new();
        if speed.rate > SPEED_FLAG_RATE {
            flags.push(format!(
                "Speed anomaly: {} of {} answers submitted in under {} seconds",
                speed.fast, speed.answered, SPEED_THRESHOLD_SECONDS
            ));
        }
        if straight_lining_rate > STRAIGHT_LINING_FLAG_RATE {
            flags.push(format!(
                "Straight-lining detected: {:.0}% of rating-scale answers share the same value",
                straight_lining_rate * 100.0
            ));
        }
        if let Some(variance) = variance {
            if variance < LOW_VARIANCE_FLAG {
                flags.push(
                    "Very low score variance within competencies suggests possible disengagement"
                        .to_string(),
                );
            } else if variance > HIGH_VARIANCE_FLAG {
                flags.push(
                    "High score variance within competencies suggests inconsistent engagement"
                        .to_string(),
                );
            }
        }

        ConsistencyResult {
            consistency_score: round_to(composite, 2),
            flags,
            speed_anomaly_rate: speed.rate,
            straight_lining_rate,
            intra_competency_variance: variance,
        }
    }

    fn average_intra_competency_variance(&self, answers: &[Answer]) -> Option<f64> {
        let mut groups: BTreeMap<&CompetencyId, Vec<f64>> = BTreeMap::new();
        for answer in answers.iter().filter(|answer| !answer.skipped) {
            groups
                .entry(answer.competency_id())
                .or_default()
                .push(self.normalizer.normalize(Some(answer)));
        }

        let variances: Vec<f64> = groups
            .values()
            .filter(|scores| scores.len() >= MIN_ANSWERS_FOR_VARIANCE)
            .map(|scores| sample_variance(scores))
            .collect();

        if variances.is_empty() {
            None
        } else {
            Some(variances.iter().sum::<f64>() / variances.len() as f64)
        }
    }
}

struct SpeedAnomalies {
    fast: usize,
    answered: usize,
    rate: f64,
}

fn speed_anomalies(answers: &[Answer]) -> SpeedAnomalies {
    let answered: Vec<&Answer> = answers
        .iter()
        .filter(|answer| !answer.skipped && answer.answered_at.is_some())
        .collect();
    let fast = answered
        .iter()
        .filter(|answer| {
            answer
                .time_spent_seconds
                .is_some_and(|seconds| seconds < SPEED_THRESHOLD_SECONDS)
        })
        .count();
    let rate = if answered.is_empty() {
        0.0
    } else {
        fast as f64 / answered.len() as f64
    };

    SpeedAnomalies {
        fast,
        answered: answered.len(),
        rate,
    }
}

fn straight_lining_rate(answers: &[Answer]) -> f64 {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    let mut total = 0usize;
    for value in answers
        .iter()
        .filter(|answer| !answer.skipped)
        .filter_map(|answer| answer.likert_value)
    {
        *counts.entry(value).or_default() += 1;
        total += 1;
    }

    match counts.values().max() {
        Some(most_common) if total > 0 => *most_common as f64 / total as f64,
        _ => 0.0,
    }
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64
}

/// Maps an average variance onto 0-1: too flat or too noisy both score low.
pub fn variance_factor(variance: f64) -> f64 {
    if variance < NORMAL_VARIANCE_LOW {
        (variance / NORMAL_VARIANCE_LOW).max(0.0)
    } else if variance <= NORMAL_VARIANCE_HIGH {
        1.0
    } else if variance >= RANDOM_VARIANCE_CEILING {
        0.0
    } else {
        1.0 - (variance - NORMAL_VARIANCE_HIGH) / (RANDOM_VARIANCE_CEILING - NORMAL_VARIANCE_HIGH)
    }
}
