use serde::{Deserialize, Serialize};

use crate::domain::{BehavioralIndicator, Competency, CompetencyId, IndicatorId};

const UNKNOWN_INDICATOR: &str = "Unknown indicator";
const UNKNOWN_COMPETENCY: &str = "Unknown competency";

/// Score achieved on one behavioral indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScore {
    pub indicator_id: IndicatorId,
    pub title: String,
    pub weight: f64,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub questions_answered: u32,
}

/// 95% confidence band derived from the competency's reliability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub standard_error: f64,
    pub lower: f64,
    pub upper: f64,
    pub reliability_alpha: f64,
}

/// Weighted roll-up of a competency's indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyScore {
    pub competency_id: CompetencyId,
    pub competency_name: String,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub questions_answered: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_code: Option<String>,
    pub indicators: Vec<IndicatorScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceInterval>,
}

impl CompetencyScore {
    pub fn with_confidence(&self, confidence: ConfidenceInterval) -> Self {
        Self {
            confidence: Some(confidence),
            ..self.clone()
        }
    }
}

/// Per-run accumulator for a single indicator.
#[derive(Debug, Clone)]
pub struct IndicatorAggregation {
    indicator_id: IndicatorId,
    title: String,
    weight: f64,
    total_score: f64,
    total_max_score: f64,
    question_count: u32,
}

impl IndicatorAggregation {
    /// Falls back to weight 1.0 when the indicator record could not be loaded.
    pub fn new(indicator_id: IndicatorId, indicator: Option<&BehavioralIndicator>) -> Self {
        let (title, weight) = match indicator {
            Some(indicator) => (indicator.title.clone(), indicator.weight),
            None => (UNKNOWN_INDICATOR.to_string(), 1.0),
        };
        Self {
            indicator_id,
            title,
            weight,
            total_score: 0.0,
            total_max_score: 0.0,
            question_count: 0,
        }
    }

    pub fn add_answer(&mut self, normalized_score: f64) {
        self.total_score += normalized_score;
        self.total_max_score += 1.0;
        self.question_count += 1;
    }

    pub fn percentage(&self) -> f64 {
        if self.total_max_score > 0.0 {
            self.total_score / self.total_max_score * 100.0
        } else {
            0.0
        }
    }

    pub fn finish(self) -> IndicatorScore {
        let percentage = self.percentage();
        IndicatorScore {
            indicator_id: self.indicator_id,
            title: self.title,
            weight: self.weight,
            score: self.total_score,
            max_score: self.total_max_score,
            percentage,
            questions_answered: self.question_count,
        }
    }
}

/// Per-run accumulator rolling indicator scores into a competency score.
#[derive(Debug, Clone)]
pub struct CompetencyAggregation {
    competency_id: CompetencyId,
    name: String,
    standard_code: Option<String>,
    weighted_percentage_sum: f64,
    total_weight: f64,
    total_score: f64,
    total_max_score: f64,
    question_count: u32,
    indicators: Vec<IndicatorScore>,
}

impl CompetencyAggregation {
    pub fn new(competency_id: CompetencyId, competency: Option<&Competency>) -> Self {
        let (name, standard_code) = match competency {
            Some(competency) => (competency.name.clone(), competency.standard_code.clone()),
            None => (UNKNOWN_COMPETENCY.to_string(), None),
        };
        Self {
            competency_id,
            name,
            standard_code,
            weighted_percentage_sum: 0.0,
            total_weight: 0.0,
            total_score: 0.0,
            total_max_score: 0.0,
            question_count: 0,
            indicators: Vec::new(),
        }
    }

    /// Adds an indicator using its own weight.
    pub fn add_indicator(&mut self, indicator: IndicatorScore) {
        let weight = indicator.weight;
        self.add_indicator_with_weight(indicator, weight);
    }

    /// Adds an indicator with an explicit weight, overriding its recorded one.
    pub fn add_indicator_with_weight(&mut self, indicator: IndicatorScore, weight: f64) {
        self.weighted_percentage_sum += weight * indicator.percentage;
        self.total_weight += weight;
        self.total_score += weight * indicator.score;
        self.total_max_score += weight * indicator.max_score;
        self.question_count += indicator.questions_answered;
        self.indicators.push(indicator);
    }

    pub fn percentage(&self) -> f64 {
        if self.total_weight > 0.0 {
            self.weighted_percentage_sum / self.total_weight
        } else {
            0.0
        }
    }

    pub fn finish(self) -> CompetencyScore {
        let percentage = self.percentage();
        CompetencyScore {
            competency_id: self.competency_id,
            competency_name: self.name,
            score: self.total_score,
            max_score: self.total_max_score,
            percentage,
            questions_answered: self.question_count,
            standard_code: self.standard_code,
            indicators: self.indicators,
            confidence: None,
        }
    }
}
