use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::memory::InMemoryQuestionBank;
use crate::domain::{
    AnswerOption, BehavioralIndicator, Competency, CompetencyId, DifficultyLevel, IndicatorId,
    Question, QuestionId, QuestionType,
};

/// Error raised while loading a question bank export.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read question bank export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid question bank CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

/// Summary of what an import added to the bank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub competencies: usize,
    pub indicators: usize,
    pub questions: usize,
}

/// Loads flattened competency/indicator/question rows into an in-memory bank.
///
/// Options are encoded as `id:text[:score]` entries separated by `|`.
pub struct QuestionBankImporter;

impl QuestionBankImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        bank: &InMemoryQuestionBank,
    ) -> Result<ImportSummary, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, bank)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        bank: &InMemoryQuestionBank,
    ) -> Result<ImportSummary, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut competencies = HashSet::new();
        let mut indicators = HashSet::new();
        let mut summary = ImportSummary::default();

        for (index, record) in csv_reader.deserialize::<BankRow>().enumerate() {
            let row = record?;
            let row_number = index + 2;

            let question_type = QuestionType::parse(&row.question_type);
            if question_type == QuestionType::Unknown {
                return Err(ImportError::InvalidRow {
                    row: row_number,
                    reason: format!("unsupported question type '{}'", row.question_type),
                });
            }
            let difficulty =
                DifficultyLevel::parse(&row.difficulty).ok_or_else(|| ImportError::InvalidRow {
                    row: row_number,
                    reason: format!("unknown difficulty '{}'", row.difficulty),
                })?;
            let options = parse_options(row.options.as_deref().unwrap_or_default())
                .map_err(|reason| ImportError::InvalidRow {
                    row: row_number,
                    reason,
                })?;
            if !question_type.is_text() && options.is_empty() {
                return Err(ImportError::InvalidRow {
                    row: row_number,
                    reason: format!("{:?} question requires answer options", question_type),
                });
            }

            let competency_id = CompetencyId::new(row.competency_id);
            if competencies.insert(competency_id.clone()) {
                bank.insert_competency(Competency {
                    id: competency_id.clone(),
                    name: row.competency_name,
                    standard_code: row.standard_code,
                    standard_title: row.standard_title,
                    active: true,
                });
                summary.competencies += 1;
            }

            let indicator_id = IndicatorId::new(row.indicator_id);
            if indicators.insert(indicator_id.clone()) {
                bank.insert_indicator(BehavioralIndicator {
                    id: indicator_id.clone(),
                    competency_id: competency_id.clone(),
                    title: row.indicator_title,
                    weight: row.indicator_weight.unwrap_or(1.0),
                    active: true,
                });
                summary.indicators += 1;
            }

            bank.insert_question(Question {
                id: QuestionId::new(row.question_id),
                indicator_id,
                competency_id,
                question_type,
                text: row.text,
                options,
                difficulty,
                active: true,
            });
            summary.questions += 1;
        }

        debug!(
            competencies = summary.competencies,
            indicators = summary.indicators,
            questions = summary.questions,
            "question bank imported"
        );
        Ok(summary)
    }
}

#[derive(Debug, Deserialize)]
struct BankRow {
    competency_id: String,
    competency_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    standard_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    standard_title: Option<String>,
    indicator_id: String,
    indicator_title: String,
    #[serde(default)]
    indicator_weight: Option<f64>,
    question_id: String,
    question_type: String,
    difficulty: String,
    text: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    options: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_options(raw: &str) -> Result<Vec<AnswerOption>, String> {
    raw.split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let id = parts.next().unwrap_or_default().trim();
            let text = parts
                .next()
                .map(str::trim)
                .ok_or_else(|| format!("option '{entry}' is missing its text"))?;
            let score = parts
                .next()
                .map(|value| {
                    value
                        .trim()
                        .parse::<f64>()
                        .map_err(|_| format!("option '{entry}' has a non-numeric score"))
                })
                .transpose()?;
            if id.is_empty() {
                return Err(format!("option '{entry}' is missing its id"));
            }
            Ok(AnswerOption {
                id: id.to_string(),
                text: text.to_string(),
                score,
            })
        })
        .collect()
}
