use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::selector::ItemSelector;
use super::{AssemblyBlueprint, AssemblyError, TestAssembler};
use crate::domain::{IndicatorId, QuestionId};
use crate::lookup::QuestionBank;

/// Fixed-size assembly over every active indicator of the listed competencies.
pub struct StandardAssembler {
    bank: Arc<dyn QuestionBank>,
    selector: Arc<ItemSelector>,
}

impl StandardAssembler {
    pub fn new(bank: Arc<dyn QuestionBank>, selector: Arc<ItemSelector>) -> Self {
        Self { bank, selector }
    }
}

impl TestAssembler for StandardAssembler {
    fn assemble(&self, blueprint: &AssemblyBlueprint) -> Result<Vec<QuestionId>, AssemblyError> {
        let AssemblyBlueprint::Standard(blueprint) = blueprint else {
            return Err(AssemblyError::UnsupportedBlueprint {
                assembler: "standard",
                actual: blueprint.kind(),
            });
        };

        let mut seen: HashSet<IndicatorId> = HashSet::new();
        let mut indicator_ids: Vec<IndicatorId> = Vec::new();
        for competency_id in &blueprint.competency_ids {
            let indicators = self.bank.indicators_for_competency(competency_id, true)?;
            if indicators.is_empty() {
                warn!(%competency_id, "competency has no active indicators; skipped");
            }
            indicator_ids.extend(
                indicators
                    .into_iter()
                    .map(|indicator| indicator.id)
                    .filter(|id| seen.insert(id.clone())),
            );
        }

        let questions = self
            .selector
            .select_validated_questions(&indicator_ids, blueprint.questions_per_indicator)?;
        debug!(
            competencies = blueprint.competency_ids.len(),
            indicators = indicator_ids.len(),
            questions = questions.len(),
            "standard assembly complete"
        );
        Ok(questions)
    }
}
