//! In-memory implementations of the lookup interfaces and a CSV bank loader.

mod importer;
mod memory;

pub use importer::{ImportError, ImportSummary, QuestionBankImporter};
pub use memory::{
    InMemoryBenchmarks, InMemoryPassports, InMemoryPsychometrics, InMemoryQuestionBank,
};
