// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::{MAX_QUESTION_POINTS, MIN_CHOICES, MIN_QUESTION_POINTS, MIN_QUESTION_TEXT_LENGTH},
    error::AppError,
    models::choice::ChoiceSpec,
};

/// Question variant discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillInBlank,
    OpenEnded,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::FillInBlank => "fill_in_blank",
            QuestionType::OpenEnded => "open_ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "fill_in_blank" => Some(QuestionType::FillInBlank),
            "open_ended" => Some(QuestionType::OpenEnded),
            _ => None,
        }
    }
}

/// Represents the 'questions' table in the database.
///
/// One row shape for all variants; the payload columns not used by a
/// variant stay NULL. The `choices` table holds multiple-choice options.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Order within the quiz.
    pub position: i32,

    /// Variant: 'multiple_choice', 'true_false', 'fill_in_blank' or
    /// 'open_ended'. Stored as TEXT; parse with `QuestionType::parse`.
    pub question_type: String,

    pub text: String,

    /// Per-question timer in seconds; required when the quiz uses
    /// per-question timer mode.
    pub timer_seconds: Option<i32>,

    /// Points awarded for a correct answer (1-10).
    pub points: i32,

    // true_false payload
    pub correct_bool: Option<bool>,
    pub explanation: Option<String>,

    // fill_in_blank payload
    pub correct_answer: Option<String>,
    /// Comma-separated accepted alternate answers.
    pub accepted_answers: Option<String>,

    // open_ended payload
    pub guidelines: Option<String>,
}

/// DTO for sending a question to participants: no correct-answer
/// material leaves the server while an attempt is open.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub text: String,
    pub timer_seconds: Option<i32>,
    pub points: i32,
    pub choices: Vec<PublicChoice>,
}

#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub text: String,
}

fn default_points() -> i32 {
    1
}

/// DTO for one question inside an upsert request.
#[derive(Debug, Deserialize, Validate)]
pub struct QuestionSpec {
    /// Ignored on update: every upsert replaces the question set
    /// wholesale, so supplied ids are never reconciled.
    pub id: Option<i64>,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[validate(length(min = 5, max = 2000, message = "Question text must be at least 5 characters."))]
    pub text: String,

    #[validate(range(min = 0))]
    pub timer_seconds: Option<i32>,

    #[serde(default = "default_points")]
    #[validate(range(min = 1, max = 10, message = "Points must be between 1 and 10."))]
    pub points: i32,

    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,

    pub correct_bool: Option<bool>,
    pub explanation: Option<String>,
    pub correct_answer: Option<String>,
    pub accepted_answers: Option<String>,
    pub guidelines: Option<String>,
}

impl QuestionSpec {
    /// Checks that the payload shape matches the variant discriminator.
    pub fn validate_variant(&self) -> Result<(), AppError> {
        if self.text.trim().len() < MIN_QUESTION_TEXT_LENGTH {
            return Err(AppError::Validation(format!(
                "Question text must be at least {} characters",
                MIN_QUESTION_TEXT_LENGTH
            )));
        }
        if self.points < MIN_QUESTION_POINTS || self.points > MAX_QUESTION_POINTS {
            return Err(AppError::Validation(format!(
                "Points must be between {} and {}",
                MIN_QUESTION_POINTS, MAX_QUESTION_POINTS
            )));
        }

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.choices.len() < MIN_CHOICES {
                    return Err(AppError::Validation(format!(
                        "A multiple-choice question needs at least {} choices",
                        MIN_CHOICES
                    )));
                }
                if self.choices.iter().any(|c| c.text.trim().is_empty()) {
                    return Err(AppError::Validation(
                        "Choice text must not be empty".to_string(),
                    ));
                }
                if !self.choices.iter().any(|c| c.is_correct) {
                    return Err(AppError::Validation(
                        "A multiple-choice question needs at least one correct choice".to_string(),
                    ));
                }
            }
            QuestionType::TrueFalse => {
                if self.correct_bool.is_none() {
                    return Err(AppError::Validation(
                        "A true/false question needs a correct answer".to_string(),
                    ));
                }
            }
            QuestionType::FillInBlank => {
                if self
                    .correct_answer
                    .as_deref()
                    .is_none_or(|a| a.trim().is_empty())
                {
                    return Err(AppError::Validation(
                        "A fill-in-the-blank question needs a correct answer".to_string(),
                    ));
                }
            }
            QuestionType::OpenEnded => {}
        }

        Ok(())
    }
}
