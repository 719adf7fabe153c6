use std::collections::HashSet;
use std::sync::Arc;

use assessment_engine::assembly::job_fit::{allocation_for_gap, difficulty_for_gap};
use assessment_engine::assembly::{ItemSelector, SelectorConfig};
use assessment_engine::bank::{InMemoryPsychometrics, InMemoryQuestionBank};
use assessment_engine::domain::{
    BehavioralIndicator, Competency, CompetencyId, DifficultyLevel, IndicatorId,
    ItemValidityStatus, Question, QuestionId, QuestionType,
};
use assessment_engine::scoring::normalizer::normalize_likert;
use assessment_engine::scoring::{CompetencyAggregation, IndicatorAggregation};
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = ItemValidityStatus> {
    prop_oneof![
        Just(ItemValidityStatus::Active),
        Just(ItemValidityStatus::Probation),
        Just(ItemValidityStatus::FlaggedForReview),
        Just(ItemValidityStatus::Retired),
    ]
}

fn single_indicator_bank(
    statuses: &[ItemValidityStatus],
) -> (Arc<InMemoryQuestionBank>, Arc<InMemoryPsychometrics>) {
    let bank = Arc::new(InMemoryQuestionBank::new());
    let psychometrics = Arc::new(InMemoryPsychometrics::new());
    bank.insert_competency(Competency {
        id: CompetencyId::new("comp-resilience"),
        name: "Resilience".to_string(),
        standard_code: None,
        standard_title: None,
        active: true,
    });
    bank.insert_indicator(BehavioralIndicator {
        id: IndicatorId::new("ind-recovers"),
        competency_id: CompetencyId::new("comp-resilience"),
        title: "Recovers from setbacks".to_string(),
        weight: 1.0,
        active: true,
    });
    for (n, status) in statuses.iter().enumerate() {
        let id = QuestionId::new(format!("q-{n:03}"));
        bank.insert_question(Question {
            id: id.clone(),
            indicator_id: IndicatorId::new("ind-recovers"),
            competency_id: CompetencyId::new("comp-resilience"),
            question_type: QuestionType::Likert,
            text: format!("Statement {n}"),
            options: Vec::new(),
            difficulty: DifficultyLevel::Intermediate,
            active: true,
        });
        psychometrics.set_status(id, *status);
    }
    (bank, psychometrics)
}

// ── Likert normalization ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn likert_normalization_stays_in_unit_range(value in -1000i32..1000) {
        let normalized = normalize_likert(value);
        prop_assert!((0.0..=1.0).contains(&normalized));
    }

    #[test]
    fn likert_normalization_is_monotonic(a in 1i32..=5, b in 1i32..=5) {
        prop_assume!(a <= b);
        prop_assert!(normalize_likert(a) <= normalize_likert(b));
    }
}

// ── Unit weights reduce to the plain mean ────────────────────────────────

proptest! {
    #[test]
    fn unit_weights_average_indicator_percentages(
        indicators in prop::collection::vec(prop::collection::vec(0.0f64..=1.0, 1..6), 1..6)
    ) {
        let mut competency = CompetencyAggregation::new(CompetencyId::new("comp-x"), None);
        let mut percentages = Vec::new();
        for (n, answers) in indicators.iter().enumerate() {
            let mut indicator =
                IndicatorAggregation::new(IndicatorId::new(format!("ind-{n}")), None);
            for answer in answers {
                indicator.add_answer(*answer);
            }
            percentages.push(indicator.percentage());
            competency.add_indicator_with_weight(indicator.finish(), 1.0);
        }
        let mean = percentages.iter().sum::<f64>() / percentages.len() as f64;
        prop_assert!((competency.percentage() - mean).abs() < 1e-9);
    }
}

// ── Retired items never reach a test ─────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn selection_never_returns_retired_items(
        statuses in prop::collection::vec(arb_status(), 1..24),
        target in 1usize..12,
        probation_percentage in 0u8..=100,
        seed in any::<u64>(),
    ) {
        let (bank, psychometrics) = single_indicator_bank(&statuses);
        let selector = ItemSelector::with_seed(
            bank,
            psychometrics,
            SelectorConfig { psychometrics_enabled: true, probation_percentage },
            seed,
        );
        let picks = selector
            .select_for_indicator(&IndicatorId::new("ind-recovers"), target, None, &HashSet::new())
            .expect("in-memory selection");

        let eligible = statuses.iter().filter(|status| status.is_eligible()).count();
        prop_assert_eq!(picks.len(), target.min(eligible));
        let unique: HashSet<&QuestionId> = picks.iter().collect();
        prop_assert_eq!(unique.len(), picks.len());
        for id in &picks {
            let index: usize = id.as_str()[2..].parse().expect("numeric suffix");
            prop_assert_ne!(statuses[index], ItemValidityStatus::Retired);
        }
    }
}

// ── Gap-driven allocation ────────────────────────────────────────────────

proptest! {
    #[test]
    fn allocation_is_bounded_and_monotonic(a in -0.5f64..1.5, b in -0.5f64..1.5) {
        prop_assume!(a <= b);
        let low = allocation_for_gap(a);
        let high = allocation_for_gap(b);
        prop_assert!((2..=8).contains(&low));
        prop_assert!(low <= high);
    }

    #[test]
    fn difficulty_rises_with_gap_and_strictness(
        a in 0.0f64..1.0,
        b in 0.0f64..1.0,
        strictness in 0u8..=100,
    ) {
        prop_assume!(a <= b);
        prop_assert!(difficulty_for_gap(a, strictness) <= difficulty_for_gap(b, strictness));
        prop_assert!(difficulty_for_gap(a, 0) <= difficulty_for_gap(a, strictness));
    }
}
