//! Psychometric scoring and test assembly.
//!
//! Answers are normalized to a 0-1 scale, rolled up through weighted
//! indicators into competency scores, and bounded with reliability-based
//! confidence intervals. Tests are assembled from the question bank either
//! per competency or from a gap analysis against an occupational benchmark.

pub mod assembly;
pub mod bank;
pub mod config;
pub mod domain;
pub mod error;
pub mod lookup;
pub mod resilience;
pub mod router;
pub mod scoring;
pub mod service;
pub mod submission;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use assembly::{AssemblyBlueprint, AssemblyError, TestAssembler};
pub use config::{AppConfig, EngineConfig};
pub use error::AppError;
pub use router::assessment_router;
pub use service::{AssessmentService, Collaborators, ServiceError, SessionReport};
