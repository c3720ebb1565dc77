// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{
    config::MIN_GLOBAL_TIMER_SECONDS,
    error::AppError,
    models::question::QuestionSpec,
};

/// How time limits apply to a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// No timer applies.
    None,
    /// One quiz-wide timer; `timer_seconds` on the quiz is required (>= 60).
    Global,
    /// Each question carries its own timer.
    Question,
}

impl TimerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::None => "none",
            TimerMode::Global => "global",
            TimerMode::Question => "question",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(TimerMode::None),
            "global" => Some(TimerMode::Global),
            "question" => Some(TimerMode::Question),
            _ => None,
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,

    /// Basis of the public short code (see utils::short_id).
    pub public_id: uuid::Uuid,

    pub title: String,
    pub description: Option<String>,

    /// Timer mode: 'none', 'global' or 'question'.
    pub timer_mode: String,

    /// Quiz-wide timer in seconds; set iff timer_mode = 'global'.
    pub timer_seconds: Option<i32>,

    pub shuffle_questions: bool,

    /// Display status: 'draft', 'scheduled', 'paused' or 'ended'.
    /// Only `is_live` gates whether the quiz accepts attempts.
    pub status: String,
    pub is_live: bool,
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,

    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Row shape for the creator's quiz list (joined question count).
#[derive(Debug, Serialize, FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub public_id: uuid::Uuid,
    pub title: String,
    pub status: String,
    pub is_live: bool,
    pub question_count: i64,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating or updating a quiz together with its question set.
/// Absence of `id` means create; presence means update with a full
/// destructive replace of the question set.
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertQuizRequest {
    pub id: Option<i64>,

    #[validate(length(min = 1, max = 80, message = "Title must be 1 to 80 characters."))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// 'none', 'global' or 'question'. Parsed and cross-checked in
    /// `validate_timer_rules`.
    pub timer_mode: String,

    pub timer_seconds: Option<i32>,

    #[serde(default)]
    pub shuffle_questions: bool,

    /// Optional display status: 'draft', 'scheduled', 'paused' or
    /// 'ended'. Only `is_live` gates taking; this picks the offline
    /// message. Defaults to 'draft' on create, unchanged on update.
    pub status: Option<String>,

    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,

    #[validate(nested)]
    pub questions: Vec<QuestionSpec>,
}

impl UpsertQuizRequest {
    /// Cross-field rules the derive cannot express: the timer-mode /
    /// timer consistency invariant and the per-variant question checks.
    pub fn validate_timer_rules(&self) -> Result<TimerMode, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title must not be empty".to_string()));
        }

        let mode = TimerMode::parse(&self.timer_mode).ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown timer mode '{}': expected none, global or question",
                self.timer_mode
            ))
        })?;

        if let Some(status) = &self.status {
            if !matches!(status.as_str(), "draft" | "scheduled" | "paused" | "ended") {
                return Err(AppError::Validation(format!(
                    "Unknown status '{}': expected draft, scheduled, paused or ended",
                    status
                )));
            }
        }

        match mode {
            TimerMode::Global => match self.timer_seconds {
                Some(t) if t >= MIN_GLOBAL_TIMER_SECONDS => {}
                Some(t) => {
                    return Err(AppError::Validation(format!(
                        "Global timer must be at least {} seconds, got {}",
                        MIN_GLOBAL_TIMER_SECONDS, t
                    )));
                }
                None => {
                    return Err(AppError::Validation(
                        "Global timer mode requires a timer".to_string(),
                    ));
                }
            },
            TimerMode::Question => {
                for (i, q) in self.questions.iter().enumerate() {
                    if q.timer_seconds.is_none() {
                        return Err(AppError::Validation(format!(
                            "Per-question timer mode requires a timer on every question (question {} has none)",
                            i + 1
                        )));
                    }
                }
            }
            TimerMode::None => {}
        }

        for q in &self.questions {
            q.validate_variant()?;
        }

        Ok(mode)
    }
}

/// DTO for flipping a quiz's liveness flag.
#[derive(Debug, Deserialize)]
pub struct SetLiveRequest {
    pub is_live: bool,
}
