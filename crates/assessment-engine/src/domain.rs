use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for competencies in the bank.
    CompetencyId
);
identifier!(
    /// Identifier wrapper for behavioral indicators.
    IndicatorId
);
identifier!(
    /// Identifier wrapper for bank questions.
    QuestionId
);

/// Question formats supported by the bank. Aliases share scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Likert,
    LikertScale,
    FrequencyScale,
    Mcq,
    MultipleChoice,
    Sjt,
    SituationalJudgment,
    CapabilityAssessment,
    PeerFeedback,
    BehavioralExample,
    OpenText,
    SelfReflection,
    #[serde(other)]
    Unknown,
}

/// Scoring family a question type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionFamily {
    Likert,
    MultipleChoice,
    SituationalJudgment,
    Capability,
    Text,
    Unknown,
}

impl QuestionType {
    pub const fn family(self) -> QuestionFamily {
        match self {
            QuestionType::Likert | QuestionType::LikertScale | QuestionType::FrequencyScale => {
                QuestionFamily::Likert
            }
            QuestionType::Mcq | QuestionType::MultipleChoice => QuestionFamily::MultipleChoice,
            QuestionType::Sjt | QuestionType::SituationalJudgment => {
                QuestionFamily::SituationalJudgment
            }
            QuestionType::CapabilityAssessment | QuestionType::PeerFeedback => {
                QuestionFamily::Capability
            }
            QuestionType::BehavioralExample
            | QuestionType::OpenText
            | QuestionType::SelfReflection => QuestionFamily::Text,
            QuestionType::Unknown => QuestionFamily::Unknown,
        }
    }

    /// Text responses are graded manually and have no scorable option set.
    pub const fn is_text(self) -> bool {
        matches!(self.family(), QuestionFamily::Text)
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "LIKERT" => QuestionType::Likert,
            "LIKERT_SCALE" => QuestionType::LikertScale,
            "FREQUENCY_SCALE" => QuestionType::FrequencyScale,
            "MCQ" => QuestionType::Mcq,
            "MULTIPLE_CHOICE" => QuestionType::MultipleChoice,
            "SJT" => QuestionType::Sjt,
            "SITUATIONAL_JUDGMENT" => QuestionType::SituationalJudgment,
            "CAPABILITY_ASSESSMENT" => QuestionType::CapabilityAssessment,
            "PEER_FEEDBACK" => QuestionType::PeerFeedback,
            "BEHAVIORAL_EXAMPLE" => QuestionType::BehavioralExample,
            "OPEN_TEXT" => QuestionType::OpenText,
            "SELF_REFLECTION" => QuestionType::SelfReflection,
            _ => QuestionType::Unknown,
        }
    }
}

/// Target difficulty of a bank item, ordered from easiest to hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyLevel {
    Foundational,
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DifficultyLevel::Foundational => "foundational",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "foundational" => Some(DifficultyLevel::Foundational),
            "intermediate" => Some(DifficultyLevel::Intermediate),
            "advanced" => Some(DifficultyLevel::Advanced),
            "expert" => Some(DifficultyLevel::Expert),
            _ => None,
        }
    }
}

/// Selectable option on a non-text question. `score` carries correctness for
/// MCQ items and effectiveness for SJT items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Bank item, hydrated with the indicator and competency it measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub indicator_id: IndicatorId,
    pub competency_id: CompetencyId,
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    pub difficulty: DifficultyLevel,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Observable behavior measured under a competency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralIndicator {
    pub id: IndicatorId,
    pub competency_id: CompetencyId,
    pub title: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Skill or trait composed of weighted indicators. The optional standard code
/// and title map the competency onto external occupational taxonomies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competency {
    pub id: CompetencyId,
    pub name: String,
    #[serde(default)]
    pub standard_code: Option<String>,
    #[serde(default)]
    pub standard_title: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Internal-consistency coefficient recorded for a competency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompetencyReliability {
    pub cronbach_alpha: f64,
}

/// Historical score distribution for a competency, on the 0-100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalStats {
    pub sample_count: u32,
    #[serde(default)]
    pub std_dev: Option<f64>,
}

/// A respondent's answer to one question within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: Question,
    #[serde(default)]
    pub likert_value: Option<i32>,
    #[serde(default)]
    pub selected_option_ids: Vec<String>,
    #[serde(default)]
    pub text_response: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub time_spent_seconds: Option<u32>,
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
}

impl Answer {
    /// Blank, unanswered response to `question`.
    pub fn blank(question: Question) -> Self {
        Self {
            question,
            likert_value: None,
            selected_option_ids: Vec::new(),
            text_response: None,
            score: None,
            skipped: false,
            time_spent_seconds: None,
            answered_at: None,
        }
    }

    pub fn competency_id(&self) -> &CompetencyId {
        &self.question.competency_id
    }

    pub fn indicator_id(&self) -> &IndicatorId {
        &self.question.indicator_id
    }
}

/// Purpose a test template was built for; drives scoring strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentGoal {
    Overview,
    JobFit,
    TeamFit,
}

impl AssessmentGoal {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentGoal::Overview => "overview",
            AssessmentGoal::JobFit => "job_fit",
            AssessmentGoal::TeamFit => "team_fit",
        }
    }
}

/// Template settings the scoring pipeline reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub goal: Option<AssessmentGoal>,
    /// Passing percentage on the 0-100 scale.
    pub passing_score: f64,
}

/// A single sitting of a template by an authenticated or anonymous candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    pub id: String,
    pub template: TestTemplate,
    #[serde(default)]
    pub candidate_id: Option<String>,
}

/// Psychometric lifecycle state of a bank item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemValidityStatus {
    Active,
    Probation,
    FlaggedForReview,
    Retired,
}

impl ItemValidityStatus {
    /// Items without recorded statistics are treated as under evaluation.
    pub const DEFAULT: ItemValidityStatus = ItemValidityStatus::Probation;

    pub const fn is_eligible(self) -> bool {
        !matches!(self, ItemValidityStatus::Retired)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ItemValidityStatus::Active => "active",
            ItemValidityStatus::Probation => "probation",
            ItemValidityStatus::FlaggedForReview => "flagged_for_review",
            ItemValidityStatus::Retired => "retired",
        }
    }
}

/// Competency scores (0-1) a candidate earned in earlier assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyPassport {
    pub scores: BTreeMap<CompetencyId, f64>,
    pub last_assessed: DateTime<Utc>,
}

/// Occupational benchmark profile keyed by competency name, values on 0-1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupationBenchmark {
    pub occupation_code: String,
    #[serde(default)]
    pub title: String,
    pub competency_targets: BTreeMap<String, f64>,
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_aliases_share_families() {
        assert_eq!(QuestionType::Likert.family(), QuestionType::FrequencyScale.family());
        assert_eq!(QuestionType::Mcq.family(), QuestionType::MultipleChoice.family());
        assert_eq!(QuestionType::Sjt.family(), QuestionType::SituationalJudgment.family());
        assert!(QuestionType::SelfReflection.is_text());
        assert!(!QuestionType::PeerFeedback.is_text());
    }

    #[test]
    fn unrecognized_question_type_deserializes_as_unknown() {
        let parsed: QuestionType = serde_json::from_str("\"RANKING\"").expect("parses");
        assert_eq!(parsed, QuestionType::Unknown);
        let parsed: QuestionType = serde_json::from_str("\"SJT\"").expect("parses");
        assert_eq!(parsed, QuestionType::Sjt);
    }

    #[test]
    fn parses_loose_type_labels() {
        assert_eq!(QuestionType::parse("likert scale"), QuestionType::LikertScale);
        assert_eq!(QuestionType::parse("open-text"), QuestionType::OpenText);
        assert_eq!(QuestionType::parse("essay"), QuestionType::Unknown);
    }

    #[test]
    fn indicator_weight_defaults_to_one() {
        let indicator: BehavioralIndicator = serde_json::from_value(serde_json::json!({
            "id": "ind-1",
            "competency_id": "comp-1",
            "title": "Listens actively"
        }))
        .expect("indicator parses");
        assert_eq!(indicator.weight, 1.0);
        assert!(indicator.active);
    }

    #[test]
    fn only_retired_items_are_ineligible() {
        assert!(ItemValidityStatus::Active.is_eligible());
        assert!(ItemValidityStatus::DEFAULT.is_eligible());
        assert!(ItemValidityStatus::FlaggedForReview.is_eligible());
        assert!(!ItemValidityStatus::Retired.is_eligible());
    }
}
