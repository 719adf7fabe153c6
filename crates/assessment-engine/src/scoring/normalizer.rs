use tracing::warn;

use crate::domain::{Answer, QuestionFamily};

const LIKERT_MIN: i32 = 1;
const LIKERT_MAX: i32 = 5;

/// Converts any answer into a 0-1 score. Pure: the same answer always yields
/// the same value, and no input makes it fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreNormalizer;

impl ScoreNormalizer {
    pub fn normalize(&self, answer: Option<&Answer>) -> f64 {
        let Some(answer) = answer else {
            return 0.0;
        };
        if answer.skipped {
            return 0.0;
        }

        match answer.question.question_type.family() {
            QuestionFamily::Likert => answer.likert_value.map(normalize_likert).unwrap_or(0.0),
            QuestionFamily::SituationalJudgment | QuestionFamily::MultipleChoice => {
                clamped_score(answer)
            }
            QuestionFamily::Capability => answer
                .likert_value
                .map(normalize_likert)
                .unwrap_or_else(|| clamped_score(answer)),
            // Ungraded text answers have no score yet and count as zero.
            QuestionFamily::Text => clamped_score(answer),
            QuestionFamily::Unknown => {
                warn!(
                    question_id = %answer.question.id,
                    "unrecognized question type; falling back to stored score"
                );
                clamped_score(answer)
            }
        }
    }
}

/// `(v - 1) / 4` after clamping to the 1-5 scale.
pub fn normalize_likert(value: i32) -> f64 {
    let clamped = value.clamp(LIKERT_MIN, LIKERT_MAX);
    f64::from(clamped - LIKERT_MIN) / f64::from(LIKERT_MAX - LIKERT_MIN)
}

fn clamped_score(answer: &Answer) -> f64 {
    answer
        .score
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}
