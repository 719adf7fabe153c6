//! Job-fit assembly driven by gap analysis.
//!
//! Benchmark targets for an occupation are compared with the candidate's
//! passport scores. Each competency's gap sets the difficulty of the questions
//! drawn for it and how many questions each of its indicators receives. Without
//! a usable passport every gap is the full benchmark value.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::matching::{AliasIndex, DEFAULT_FUZZY_THRESHOLD};
use super::selector::ItemSelector;
use super::{AssemblyBlueprint, AssemblyError, JobFitBlueprint, TestAssembler};
use crate::domain::{
    Competency, CompetencyId, CompetencyPassport, DifficultyLevel, IndicatorId, QuestionId,
};
use crate::lookup::{BenchmarkLookup, PassportLookup, QuestionBank};
use crate::resilience::Clock;

pub const MIN_QUESTIONS_PER_INDICATOR: usize = 2;
pub const MAX_QUESTIONS_PER_INDICATOR: usize = 8;
pub const MAX_TOTAL_QUESTIONS: usize = 50;
const SIGNIFICANT_GAP_AT_ZERO_STRICTNESS: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitConfig {
    pub passport_max_age_days: i64,
    pub default_strictness: u8,
    pub fuzzy_threshold: f64,
}

impl Default for JobFitConfig {
    fn default() -> Self {
        Self {
            passport_max_age_days: 180,
            default_strictness: 50,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Gap analysis for one benchmarked competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapInfo {
    pub competency_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competency_id: Option<CompetencyId>,
    pub benchmark: f64,
    pub candidate_score: f64,
    pub gap: f64,
    pub is_significant: bool,
    pub difficulty: DifficultyLevel,
}

/// Questions requested and drawn for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorAllocation {
    pub indicator_id: IndicatorId,
    pub competency_id: CompetencyId,
    pub gap: f64,
    pub difficulty: DifficultyLevel,
    pub requested: usize,
    pub selected: Vec<QuestionId>,
}

/// Full record of a job-fit assembly, for auditing the gap analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitPlan {
    pub occupation_code: String,
    pub strictness_level: u8,
    pub full_assessment: bool,
    pub gaps: Vec<GapInfo>,
    pub allocations: Vec<IndicatorAllocation>,
    pub question_ids: Vec<QuestionId>,
}

impl JobFitPlan {
    fn empty(occupation_code: &str, strictness_level: u8) -> Self {
        Self {
            occupation_code: occupation_code.to_string(),
            strictness_level,
            full_assessment: true,
            gaps: Vec::new(),
            allocations: Vec::new(),
            question_ids: Vec::new(),
        }
    }

    pub fn significant_gaps(&self) -> impl Iterator<Item = &GapInfo> {
        self.gaps.iter().filter(|gap| gap.is_significant)
    }
}

/// `0.2 * (100 - strictness) / 100`.
pub fn significance_threshold(strictness_level: u8) -> f64 {
    let strictness = f64::from(strictness_level.min(100));
    SIGNIFICANT_GAP_AT_ZERO_STRICTNESS * (100.0 - strictness) / 100.0
}

/// Graduated gap bands, narrowed as strictness rises.
pub fn difficulty_for_gap(gap: f64, strictness_level: u8) -> DifficultyLevel {
    let factor = 1.0 - f64::from(strictness_level.min(100)) / 200.0;
    if gap >= 0.8 * factor {
        DifficultyLevel::Expert
    } else if gap >= 0.5 * factor {
        DifficultyLevel::Advanced
    } else if gap >= 0.2 * factor {
        DifficultyLevel::Intermediate
    } else {
        DifficultyLevel::Foundational
    }
}

/// Per-indicator question count proportional to the gap.
pub fn allocation_for_gap(gap: f64) -> usize {
    let span = (MAX_QUESTIONS_PER_INDICATOR - MIN_QUESTIONS_PER_INDICATOR) as f64;
    let raw = (MIN_QUESTIONS_PER_INDICATOR as f64 + gap.max(0.0) * span).round();
    (raw as usize).clamp(MIN_QUESTIONS_PER_INDICATOR, MAX_QUESTIONS_PER_INDICATOR)
}

pub struct JobFitAssembler {
    bank: Arc<dyn QuestionBank>,
    selector: Arc<ItemSelector>,
    benchmarks: Arc<dyn BenchmarkLookup>,
    passports: Arc<dyn PassportLookup>,
    clock: Arc<dyn Clock>,
    config: JobFitConfig,
}

impl JobFitAssembler {
    pub fn new(
        bank: Arc<dyn QuestionBank>,
        selector: Arc<ItemSelector>,
        benchmarks: Arc<dyn BenchmarkLookup>,
        passports: Arc<dyn PassportLookup>,
        clock: Arc<dyn Clock>,
        config: JobFitConfig,
    ) -> Self {
        Self {
            bank,
            selector,
            benchmarks,
            passports,
            clock,
            config,
        }
    }

    pub fn plan(&self, blueprint: &JobFitBlueprint) -> Result<JobFitPlan, AssemblyError> {
        let strictness = blueprint
            .strictness_level
            .unwrap_or(self.config.default_strictness)
            .min(100);
        let code = blueprint.occupation_code.trim();

        let Some(benchmark) = self.benchmarks.benchmark(code)? else {
            info!(occupation_code = code, "no benchmark profile; nothing to assemble");
            return Ok(JobFitPlan::empty(code, strictness));
        };

        let competencies = self.bank.competencies(true)?;
        let mut bank_index = AliasIndex::new(self.config.fuzzy_threshold);
        for competency in &competencies {
            for alias in aliases(competency) {
                bank_index.insert(alias, competency.id.clone());
            }
        }

        let passport = self.fresh_passport(blueprint.candidate_id.as_deref());
        let full_assessment = passport.is_none();
        let passport_index = match &passport {
            Some(passport) => self.passport_index(passport, &competencies),
            None => AliasIndex::new(self.config.fuzzy_threshold),
        };

        let gaps: Vec<GapInfo> = benchmark
            .competency_targets
            .iter()
            .map(|(name, target)| {
                let candidate_score = passport_index
                    .resolve(name)
                    .map(|score| score.clamp(0.0, 1.0))
                    .unwrap_or(0.0);
                let gap = (target - candidate_score).max(0.0);
                GapInfo {
                    competency_name: name.clone(),
                    competency_id: bank_index.resolve(name),
                    benchmark: *target,
                    candidate_score,
                    gap,
                    is_significant: gap > significance_threshold(strictness),
                    difficulty: difficulty_for_gap(gap, strictness),
                }
            })
            .collect();

        // Several benchmark names can alias one competency; its largest gap wins.
        let mut targets: Vec<&GapInfo> = Vec::new();
        for gap in &gaps {
            let Some(competency_id) = &gap.competency_id else {
                warn!(
                    competency = gap.competency_name.as_str(),
                    "benchmark competency not found in bank; contributes no questions"
                );
                continue;
            };
            let existing = targets
                .iter()
                .position(|target| target.competency_id.as_ref() == Some(competency_id));
            match existing {
                Some(index) if gap.gap > targets[index].gap => targets[index] = gap,
                Some(_) => {}
                None => targets.push(gap),
            }
        }

        let mut allocations = Vec::new();
        for gap in targets {
            let Some(competency_id) = &gap.competency_id else {
                continue;
            };
            let indicators = self.bank.indicators_for_competency(competency_id, true)?;
            if indicators.is_empty() {
                warn!(
                    competency = gap.competency_name.as_str(),
                    %competency_id,
                    "benchmark competency has no active indicators; contributes no questions"
                );
            }
            allocations.extend(indicators.into_iter().map(|indicator| IndicatorAllocation {
                indicator_id: indicator.id,
                competency_id: competency_id.clone(),
                gap: gap.gap,
                difficulty: gap.difficulty,
                requested: allocation_for_gap(gap.gap),
                selected: Vec::new(),
            }));
        }

        allocations.sort_by(|left, right| right.gap.total_cmp(&left.gap));

        let mut remaining = MAX_TOTAL_QUESTIONS;
        let mut used: HashSet<QuestionId> = HashSet::new();
        let mut question_ids = Vec::new();
        for allocation in &mut allocations {
            allocation.requested = allocation.requested.min(remaining);
            if allocation.requested == 0 {
                continue;
            }
            allocation.selected = self.selector.select_for_indicator(
                &allocation.indicator_id,
                allocation.requested,
                Some(allocation.difficulty),
                &used,
            )?;
            remaining -= allocation.selected.len().min(remaining);
            used.extend(allocation.selected.iter().cloned());
            question_ids.extend(allocation.selected.iter().cloned());
        }

        let plan = JobFitPlan {
            occupation_code: code.to_string(),
            strictness_level: strictness,
            full_assessment,
            gaps,
            allocations,
            question_ids,
        };
        debug!(
            occupation_code = code,
            strictness,
            full_assessment,
            competencies = plan.gaps.len(),
            significant = plan.significant_gaps().count(),
            questions = plan.question_ids.len(),
            "job-fit assembly planned"
        );
        Ok(plan)
    }

    /// Passport for the candidate, or `None` when absent, unreadable or stale.
    fn fresh_passport(&self, candidate_id: Option<&str>) -> Option<CompetencyPassport> {
        let candidate_id = candidate_id.map(str::trim).filter(|id| !id.is_empty())?;
        let passport = match self.passports.passport(candidate_id) {
            Ok(passport) => passport?,
            Err(error) => {
                warn!(candidate_id, %error, "passport lookup failed; assessing all competencies");
                return None;
            }
        };

        let age_days = (self.clock.now() - passport.last_assessed).num_days();
        if age_days > self.config.passport_max_age_days {
            warn!(
                candidate_id,
                age_days,
                max_age_days = self.config.passport_max_age_days,
                "passport is stale; assessing all competencies"
            );
            return None;
        }
        Some(passport)
    }

    fn passport_index(
        &self,
        passport: &CompetencyPassport,
        competencies: &[Competency],
    ) -> AliasIndex<f64> {
        let by_id: BTreeMap<&CompetencyId, &Competency> = competencies
            .iter()
            .map(|competency| (&competency.id, competency))
            .collect();

        let mut index = AliasIndex::new(self.config.fuzzy_threshold);
        for (competency_id, score) in &passport.scores {
            let record = match by_id.get(competency_id) {
                Some(competency) => Some((*competency).clone()),
                None => self.bank.competency(competency_id).unwrap_or_else(|error| {
                    warn!(%competency_id, %error, "passport competency lookup failed");
                    None
                }),
            };
            match record {
                Some(competency) => {
                    for alias in aliases(&competency) {
                        index.insert(alias, *score);
                    }
                }
                None => index.insert(competency_id.as_str(), *score),
            }
        }
        index
    }
}

impl TestAssembler for JobFitAssembler {
    fn assemble(&self, blueprint: &AssemblyBlueprint) -> Result<Vec<QuestionId>, AssemblyError> {
        match blueprint {
            AssemblyBlueprint::JobFit(blueprint) => Ok(self.plan(blueprint)?.question_ids),
            other => Err(AssemblyError::UnsupportedBlueprint {
                assembler: "job_fit",
                actual: other.kind(),
            }),
        }
    }
}

fn aliases(competency: &Competency) -> impl Iterator<Item = &str> {
    std::iter::once(competency.name.as_str())
        .chain(competency.standard_code.as_deref())
        .chain(competency.standard_title.as_deref())
}
