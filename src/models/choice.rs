// src/models/choice.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'choices' table in the database.
/// Only multiple-choice questions own rows here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,

    /// Order within the question.
    pub position: i32,

    pub text: String,
    pub is_correct: bool,
}

/// DTO for one choice inside an upsert request.
#[derive(Debug, Deserialize, Serialize, validator::Validate)]
pub struct ChoiceSpec {
    #[validate(length(min = 1, max = 500, message = "Choice text must not be empty."))]
    pub text: String,

    #[serde(default)]
    pub is_correct: bool,
}
