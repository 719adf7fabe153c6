use crate::cli::DataArgs;
use assessment_engine::bank::{
    InMemoryBenchmarks, InMemoryPassports, InMemoryPsychometrics, InMemoryQuestionBank,
    QuestionBankImporter,
};
use assessment_engine::domain::OccupationBenchmark;
use assessment_engine::error::AppError;
use assessment_engine::resilience::{ResilientQuestionBank, SystemClock};
use assessment_engine::{AssessmentService, Collaborators, EngineConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::Cursor;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

const DEMO_BANK_CSV: &str = include_str!("../data/demo_bank.csv");
const DEMO_BENCHMARKS_JSON: &str = include_str!("../data/demo_benchmarks.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the bank and benchmarks, then wires the in-memory collaborators
/// behind a circuit-broken question bank.
pub(crate) fn build_service(
    config: &EngineConfig,
    data: &DataArgs,
) -> Result<AssessmentService, AppError> {
    let store = Arc::new(InMemoryQuestionBank::new());
    let summary = match &data.bank_csv {
        Some(path) => QuestionBankImporter::from_path(path, &store)?,
        None => QuestionBankImporter::from_reader(Cursor::new(DEMO_BANK_CSV), &store)?,
    };

    let benchmarks = Arc::new(InMemoryBenchmarks::new());
    let profiles = match &data.benchmarks {
        Some(path) => parse_benchmarks(&std::fs::read_to_string(path)?)?,
        None => parse_benchmarks(DEMO_BENCHMARKS_JSON)?,
    };
    let benchmark_count = profiles.len();
    for profile in profiles {
        benchmarks.insert(profile);
    }

    info!(
        competencies = summary.competencies,
        indicators = summary.indicators,
        questions = summary.questions,
        benchmarks = benchmark_count,
        "assessment data loaded"
    );

    let clock = Arc::new(SystemClock);
    let bank = Arc::new(ResilientQuestionBank::new(
        store,
        config.breaker.clone(),
        config.cache_capacity,
        clock.clone(),
    ));
    let psychometrics = Arc::new(InMemoryPsychometrics::new());

    let collaborators = Collaborators {
        bank,
        reliability: psychometrics.clone(),
        history: psychometrics.clone(),
        item_statistics: psychometrics,
        benchmarks,
        passports: Arc::new(InMemoryPassports::new()),
        clock,
    };
    Ok(AssessmentService::new(collaborators, config))
}

pub(crate) fn parse_benchmarks(raw: &str) -> Result<Vec<OccupationBenchmark>, AppError> {
    serde_json::from_str(raw).map_err(|err| AppError::Io(std::io::Error::from(err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_engine::assembly::{AssemblyBlueprint, JobFitBlueprint};

    #[test]
    fn bundled_data_supports_job_fit_assembly() {
        let service = build_service(&EngineConfig::default(), &DataArgs::default())
            .expect("bundled data loads");

        let plan = service
            .plan_job_fit(&JobFitBlueprint {
                occupation_code: "15-1252.00".to_string(),
                candidate_id: None,
                strictness_level: None,
            })
            .expect("plan builds");

        assert!(plan.full_assessment);
        assert_eq!(plan.gaps.len(), 2);
        assert!(plan.gaps.iter().all(|gap| gap.competency_id.is_some()));

        let questions = service
            .assemble(&AssemblyBlueprint::JobFit(JobFitBlueprint {
                occupation_code: "15-1252.00".to_string(),
                candidate_id: None,
                strictness_level: None,
            }))
            .expect("assembly succeeds");
        assert!(!questions.is_empty());
    }

    #[test]
    fn malformed_benchmarks_are_rejected() {
        let error = parse_benchmarks("{ not json").expect_err("invalid json");
        assert!(matches!(error, AppError::Io(_)));
    }
}
