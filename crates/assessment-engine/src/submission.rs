//! Turns a raw submission into a stored [`Answer`] with its score field set.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Answer, Question, QuestionFamily};

/// Respondent input as received from the session UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnswer {
    #[serde(default)]
    pub likert_value: Option<i32>,
    #[serde(default)]
    pub selected_option_ids: Vec<String>,
    #[serde(default)]
    pub text_response: Option<String>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub time_spent_seconds: Option<u32>,
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
}

pub fn prepare_answer(question: Question, raw: RawAnswer) -> Answer {
    let mut answer = Answer::blank(question);
    answer.skipped = raw.skipped;
    answer.time_spent_seconds = raw.time_spent_seconds;
    answer.answered_at = raw.answered_at;
    if raw.skipped {
        return answer;
    }

    match answer.question.question_type.family() {
        QuestionFamily::Likert | QuestionFamily::Capability => {
            answer.likert_value = raw.likert_value.map(|value| value.clamp(1, 5));
        }
        QuestionFamily::MultipleChoice => {
            answer.score = Some(choice_correctness(&answer.question, &raw.selected_option_ids));
            answer.selected_option_ids = raw.selected_option_ids;
        }
        QuestionFamily::SituationalJudgment => {
            answer.score = judgment_effectiveness(&answer.question, &raw.selected_option_ids);
            answer.selected_option_ids = raw.selected_option_ids;
        }
        QuestionFamily::Text => {
            answer.text_response = raw.text_response;
        }
        QuestionFamily::Unknown => {
            answer.likert_value = raw.likert_value;
            answer.selected_option_ids = raw.selected_option_ids;
            answer.text_response = raw.text_response;
        }
    }

    answer
}

/// Stores a manual rubric grade as a 0-1 score. A non-positive maximum leaves
/// the answer ungraded.
pub fn grade_text_answer(mut answer: Answer, points: f64, max_points: f64) -> Answer {
    if max_points > 0.0 && points.is_finite() {
        answer.score = Some((points / max_points).clamp(0.0, 1.0));
    }
    answer
}

/// Correct when the selection is exactly the set of positively scored options.
fn choice_correctness(question: &Question, selected: &[String]) -> f64 {
    let correct: BTreeSet<&str> = question
        .options
        .iter()
        .filter(|option| option.score.is_some_and(|score| score > 0.0))
        .map(|option| option.id.as_str())
        .collect();
    let chosen: BTreeSet<&str> = selected.iter().map(String::as_str).collect();

    if !correct.is_empty() && correct == chosen {
        1.0
    } else {
        0.0
    }
}

/// Selected option's effectiveness relative to the best available option.
fn judgment_effectiveness(question: &Question, selected: &[String]) -> Option<f64> {
    let chosen = selected.first()?;
    let best = question
        .options
        .iter()
        .filter_map(|option| option.score)
        .fold(0.0_f64, f64::max);
    let score = question
        .options
        .iter()
        .find(|option| &option.id == chosen)
        .and_then(|option| option.score)
        .unwrap_or(0.0);

    if best > 0.0 {
        Some((score / best).clamp(0.0, 1.0))
    } else {
        Some(0.0)
    }
}
