// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'attempts' table in the database.
/// One participant's single pass through a quiz. Immutable once
/// `submitted_at` is set.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub quiz_id: i64,
    pub participant_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub score: Option<i32>,
}

/// Represents the 'attempt_answers' table in the database.
/// Exactly one row per (attempt, question), enforced by a unique index.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub choice_id: Option<i64>,
    pub answer_text: Option<String>,

    /// NULL means ungraded (open-ended questions await manual review).
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
}

/// One submitted answer. Which field is read depends on the question
/// variant: `choice_id` for multiple choice, `answer_bool` for
/// true/false, `answer_text` for fill-in-the-blank and open-ended.
#[derive(Debug, Deserialize, Serialize)]
pub struct AnswerSubmission {
    pub question_id: i64,
    pub choice_id: Option<i64>,
    pub answer_bool: Option<bool>,
    pub answer_text: Option<String>,
}

/// DTO for submitting a whole attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<AnswerSubmission>,
}

/// Per-question outcome returned after submission.
#[derive(Debug, Serialize)]
pub struct AnswerResult {
    pub question_id: i64,
    /// None for ungraded open-ended answers.
    pub is_correct: Option<bool>,
    pub points_awarded: i32,
    pub max_points: i32,
}

/// Response body for a submitted attempt.
#[derive(Debug, Serialize)]
pub struct SubmitAttemptResponse {
    pub attempt_id: i64,
    pub score: i32,
    pub max_score: i32,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub results: Vec<AnswerResult>,
}
