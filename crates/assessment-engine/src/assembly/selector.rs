use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{DifficultyLevel, IndicatorId, ItemValidityStatus, Question, QuestionId};
use crate::lookup::{ItemStatisticsLookup, LookupError, QuestionBank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub psychometrics_enabled: bool,
    /// Share of each selection reserved for probation items, 0-100.
    pub probation_percentage: u8,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            psychometrics_enabled: true,
            probation_percentage: 20,
        }
    }
}

/// Count of an indicator's active questions per validity status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAvailability {
    pub active: usize,
    pub probation: usize,
    pub flagged_for_review: usize,
    pub retired: usize,
}

impl ItemAvailability {
    /// Items that may still be assembled into a test.
    pub fn eligible(&self) -> usize {
        self.active + self.probation + self.flagged_for_review
    }
}

/// Picks questions per indicator, honouring item validity status.
pub struct ItemSelector {
    bank: Arc<dyn QuestionBank>,
    statistics: Arc<dyn ItemStatisticsLookup>,
    config: SelectorConfig,
    rng: Mutex<StdRng>,
}

impl ItemSelector {
    pub fn new(
        bank: Arc<dyn QuestionBank>,
        statistics: Arc<dyn ItemStatisticsLookup>,
        config: SelectorConfig,
    ) -> Self {
        Self::with_rng(bank, statistics, config, StdRng::from_entropy())
    }

    /// Deterministic selector for reproducible assemblies.
    pub fn with_seed(
        bank: Arc<dyn QuestionBank>,
        statistics: Arc<dyn ItemStatisticsLookup>,
        config: SelectorConfig,
        seed: u64,
    ) -> Self {
        Self::with_rng(bank, statistics, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(
        bank: Arc<dyn QuestionBank>,
        statistics: Arc<dyn ItemStatisticsLookup>,
        config: SelectorConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            bank,
            statistics,
            config,
            rng: Mutex::new(rng),
        }
    }

    /// Selects up to `per_indicator` questions for each indicator, never
    /// repeating a question across indicators.
    pub fn select_validated_questions(
        &self,
        indicator_ids: &[IndicatorId],
        per_indicator: usize,
    ) -> Result<Vec<QuestionId>, LookupError> {
        let mut used = HashSet::new();
        let mut selected = Vec::new();
        for indicator_id in indicator_ids {
            let picks = self.select_for_indicator(indicator_id, per_indicator, None, &used)?;
            used.extend(picks.iter().cloned());
            selected.extend(picks);
        }
        Ok(selected)
    }

    /// Selects up to `target` questions for one indicator. Questions at the
    /// requested difficulty are preferred; other difficulties only fill a
    /// shortfall. Ids in `exclude` are never returned.
    pub fn select_for_indicator(
        &self,
        indicator_id: &IndicatorId,
        target: usize,
        difficulty: Option<DifficultyLevel>,
        exclude: &HashSet<QuestionId>,
    ) -> Result<Vec<QuestionId>, LookupError> {
        if target == 0 {
            return Ok(Vec::new());
        }

        let questions: Vec<Question> = self
            .bank
            .questions_for_indicator(indicator_id, true)?
            .into_iter()
            .filter(|question| !exclude.contains(&question.id))
            .collect();
        let statuses = if self.config.psychometrics_enabled {
            let ids: Vec<QuestionId> = questions
                .iter()
                .map(|question| question.id.clone())
                .collect();
            self.statistics.statuses(&ids)?
        } else {
            HashMap::new()
        };

        let (preferred, others): (Vec<Question>, Vec<Question>) = match difficulty {
            Some(level) => questions
                .into_iter()
                .partition(|question| question.difficulty == level),
            None => (questions, Vec::new()),
        };

        let mut selected = self.pick(&preferred, &statuses, target);
        if selected.len() < target && !others.is_empty() {
            let shortfall = target - selected.len();
            debug!(
                indicator_id = %indicator_id,
                shortfall,
                "not enough items at target difficulty; widening pool"
            );
            selected.extend(self.pick(&others, &statuses, shortfall));
        }

        if selected.len() < target {
            warn!(
                indicator_id = %indicator_id,
                requested = target,
                selected = selected.len(),
                "indicator has fewer eligible questions than requested"
            );
        }
        Ok(selected)
    }

    /// Whether a question may appear in an assembled test. Failures to read
    /// its statistics count as ineligible.
    pub fn is_eligible_for_assembly(&self, question_id: &QuestionId) -> bool {
        match self.statistics.status(question_id) {
            Ok(status) => status.unwrap_or(ItemValidityStatus::DEFAULT).is_eligible(),
            Err(error) => {
                warn!(%question_id, %error, "item statistics unavailable; treating as ineligible");
                false
            }
        }
    }

    pub fn availability(
        &self,
        indicator_id: &IndicatorId,
    ) -> Result<ItemAvailability, LookupError> {
        let ids: Vec<QuestionId> = self
            .bank
            .questions_for_indicator(indicator_id, true)?
            .into_iter()
            .map(|question| question.id)
            .collect();
        let statuses = self.statistics.statuses(&ids)?;

        let mut availability = ItemAvailability::default();
        for id in &ids {
            match statuses.get(id).copied().unwrap_or(ItemValidityStatus::DEFAULT) {
                ItemValidityStatus::Active => availability.active += 1,
                ItemValidityStatus::Probation => availability.probation += 1,
                ItemValidityStatus::FlaggedForReview => availability.flagged_for_review += 1,
                ItemValidityStatus::Retired => availability.retired += 1,
            }
        }
        Ok(availability)
    }

    pub fn has_sufficient_questions(
        &self,
        indicator_id: &IndicatorId,
        required: usize,
    ) -> Result<bool, LookupError> {
        Ok(self.availability(indicator_id)?.eligible() >= required)
    }

    fn pick(
        &self,
        questions: &[Question],
        statuses: &HashMap<QuestionId, ItemValidityStatus>,
        target: usize,
    ) -> Vec<QuestionId> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.config.psychometrics_enabled {
            let mut pool: Vec<QuestionId> = questions
                .iter()
                .map(|question| question.id.clone())
                .collect();
            pool.shuffle(&mut *rng);
            pool.truncate(target);
            return pool;
        }

        let mut active = Vec::new();
        let mut probation = Vec::new();
        let mut flagged = Vec::new();
        for question in questions {
            match statuses
                .get(&question.id)
                .copied()
                .unwrap_or(ItemValidityStatus::DEFAULT)
            {
                ItemValidityStatus::Active => active.push(question.id.clone()),
                ItemValidityStatus::Probation => probation.push(question.id.clone()),
                ItemValidityStatus::FlaggedForReview => flagged.push(question.id.clone()),
                ItemValidityStatus::Retired => {}
            }
        }
        active.shuffle(&mut *rng);
        probation.shuffle(&mut *rng);
        flagged.shuffle(&mut *rng);

        let reserved =
            probation_quota(target, self.config.probation_percentage).min(probation.len());
        let primary = active.len().min(target.saturating_sub(reserved));

        let mut active = active.into_iter();
        let mut probation = probation.into_iter();
        let mut pool: Vec<QuestionId> = active.by_ref().take(primary).collect();
        pool.extend(probation.by_ref().take(reserved));

        for fallback in [active.by_ref().collect::<Vec<_>>(), probation.collect(), flagged] {
            if pool.len() >= target {
                break;
            }
            let shortfall = target - pool.len();
            pool.extend(fallback.into_iter().take(shortfall));
        }

        pool.shuffle(&mut *rng);
        pool.truncate(target);
        pool
    }
}

/// `max(1, target * pct / 100)` probation slots per selection.
pub fn probation_quota(target: usize, probation_percentage: u8) -> usize {
    (target * usize::from(probation_percentage.min(100)) / 100).max(1)
}
