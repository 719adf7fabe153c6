//! Test assembly: picking the questions a session will present.
//!
//! Each assembler fulfils exactly one blueprint variant. Handing an assembler
//! a blueprint it does not own is a programming error and is reported as
//! [`AssemblyError::UnsupportedBlueprint`] rather than degraded around.

pub mod job_fit;
pub mod matching;
pub mod selector;
pub mod standard;

pub use job_fit::{GapInfo, IndicatorAllocation, JobFitAssembler, JobFitConfig, JobFitPlan};
pub use selector::{ItemAvailability, ItemSelector, SelectorConfig};
pub use standard::StandardAssembler;

use serde::{Deserialize, Serialize};

use crate::domain::{CompetencyId, QuestionId};
use crate::lookup::LookupError;

/// Request describing which questions a new session should contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssemblyBlueprint {
    Standard(StandardBlueprint),
    JobFit(JobFitBlueprint),
}

impl AssemblyBlueprint {
    pub const fn kind(&self) -> &'static str {
        match self {
            AssemblyBlueprint::Standard(_) => "standard",
            AssemblyBlueprint::JobFit(_) => "job_fit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardBlueprint {
    pub competency_ids: Vec<CompetencyId>,
    pub questions_per_indicator: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFitBlueprint {
    /// Occupation code of the benchmark profile, e.g. an O*NET SOC code.
    pub occupation_code: String,
    /// External identity of the candidate whose passport drives delta testing.
    #[serde(default)]
    pub candidate_id: Option<String>,
    /// 0-100; higher strictness lowers the gap needed to count as significant.
    #[serde(default)]
    pub strictness_level: Option<u8>,
}

/// Error raised by an assembler.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("{assembler} assembler cannot handle a {actual} blueprint")]
    UnsupportedBlueprint {
        assembler: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Produces an ordered list of question ids for a blueprint.
pub trait TestAssembler: Send + Sync {
    fn assemble(&self, blueprint: &AssemblyBlueprint) -> Result<Vec<QuestionId>, AssemblyError>;
}
