use std::sync::Arc;

use tracing::{debug, warn};

use super::aggregation::{CompetencyScore, ConfidenceInterval};
use super::precision::round_to;
use crate::domain::{CompetencyId, HistoricalStats};
use crate::lookup::{ReliabilityLookup, ScoreHistoryLookup};

/// Standard deviation assumed for 0-100 scores without enough history.
pub const DEFAULT_STANDARD_DEVIATION: f64 = 15.0;
/// Two-tailed z value for a 95% interval.
pub const Z_95: f64 = 1.96;
/// Sample size from which the historical spread is trusted.
pub const LARGE_SAMPLE_MIN: u32 = 30;
/// At or below this sample size the default spread is used unadjusted.
pub const SMALL_SAMPLE_MAX: u32 = 5;

/// Attaches reliability-based confidence intervals to competency scores.
///
/// Competencies without a usable Cronbach's alpha are returned untouched.
pub struct ConfidenceIntervalCalculator {
    reliability: Arc<dyn ReliabilityLookup>,
    history: Arc<dyn ScoreHistoryLookup>,
}

impl ConfidenceIntervalCalculator {
    pub fn new(
        reliability: Arc<dyn ReliabilityLookup>,
        history: Arc<dyn ScoreHistoryLookup>,
    ) -> Self {
        Self {
            reliability,
            history,
        }
    }

    pub fn enrich_with_confidence_intervals(
        &self,
        scores: &[CompetencyScore],
    ) -> Vec<CompetencyScore> {
        if scores.is_empty() {
            return Vec::new();
        }

        let ids: Vec<CompetencyId> = scores
            .iter()
            .map(|score| score.competency_id.clone())
            .collect();
        let reliabilities = match self.reliability.reliabilities(&ids) {
            Ok(reliabilities) => reliabilities,
            Err(error) => {
                warn!(%error, "reliability lookup failed; confidence intervals skipped");
                return scores.to_vec();
            }
        };

        scores
            .iter()
            .map(|score| {
                let Some(reliability) = reliabilities.get(&score.competency_id) else {
                    return score.clone();
                };
                let stats = self.history_for(&score.competency_id);
                let standard_deviation = estimate_standard_deviation(&score.competency_id, stats);
                match confidence_interval(
                    score.percentage,
                    reliability.cronbach_alpha,
                    standard_deviation,
                ) {
                    Some(interval) => score.with_confidence(interval),
                    None => {
                        debug!(
                            competency_id = %score.competency_id,
                            alpha = reliability.cronbach_alpha,
                            "alpha outside (0, 1]; confidence interval skipped"
                        );
                        score.clone()
                    }
                }
            })
            .collect()
    }

    fn history_for(&self, id: &CompetencyId) -> HistoricalStats {
        self.history.history(id).unwrap_or_else(|error| {
            warn!(competency_id = %id, %error, "score history unavailable; using default spread");
            HistoricalStats::default()
        })
    }
}

/// Three-tier spread estimate keyed by historical sample size.
pub fn estimate_standard_deviation(id: &CompetencyId, stats: HistoricalStats) -> f64 {
    let n = stats.sample_count;
    if n >= LARGE_SAMPLE_MIN {
        return stats
            .std_dev
            .filter(|sd| sd.is_finite() && *sd > 0.0)
            .unwrap_or(DEFAULT_STANDARD_DEVIATION);
    }

    if n > SMALL_SAMPLE_MAX {
        return DEFAULT_STANDARD_DEVIATION * (f64::from(LARGE_SAMPLE_MIN) / f64::from(n)).sqrt();
    }

    warn!(
        competency_id = %id,
        sample_count = n,
        "too few historical results; confidence interval may be unreliable"
    );
    DEFAULT_STANDARD_DEVIATION
}

/// `SEM = SD * sqrt(1 - alpha)` and a 95% band clamped to 0-100.
/// Returns `None` when alpha is outside (0, 1].
pub fn confidence_interval(
    percentage: f64,
    alpha: f64,
    standard_deviation: f64,
) -> Option<ConfidenceInterval> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return None;
    }

    let standard_error = standard_deviation * (1.0 - alpha).sqrt();
    let margin = Z_95 * standard_error;
    Some(ConfidenceInterval {
        standard_error: round_to(standard_error, 2),
        lower: round_to((percentage - margin).max(0.0), 2),
        upper: round_to((percentage + margin).min(100.0), 2),
        reliability_alpha: round_to(alpha, 4),
    })
}
