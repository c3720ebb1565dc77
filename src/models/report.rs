// src/models/report.rs

use serde::Serialize;
use sqlx::FromRow;

/// Per-quiz statistics derived from its attempts.
#[derive(Debug, Serialize, PartialEq)]
pub struct QuizReport {
    pub quiz_id: i64,
    pub title: String,

    /// Number of distinct participant identities among attempts.
    pub participant_count: i64,

    /// Mean over all graded answers of awarded/max points, as a percentage.
    pub accuracy: f64,

    /// Mean over all attempts of answered/total questions, as a percentage.
    pub completion_rate: f64,

    /// Most recent submission time; None if nothing was submitted.
    pub last_attempt: Option<chrono::DateTime<chrono::Utc>>,
}

/// Dashboard rollup across all of a creator's quizzes.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub quiz_count: i64,
    pub total_participants: i64,

    /// Arithmetic mean of per-quiz accuracy values (mean of means).
    pub average_accuracy: f64,
    pub average_completion_rate: f64,
}

/// Minimal attempt row used by the aggregator.
#[derive(Debug, FromRow)]
pub struct AttemptStat {
    pub id: i64,
    pub participant_id: i64,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Minimal answer row used by the aggregator: the awarded points, the
/// question's max points, and whether the answer was machine-graded.
#[derive(Debug, FromRow)]
pub struct AnswerStat {
    pub attempt_id: i64,
    pub points_awarded: i32,
    pub max_points: i32,
    pub is_correct: Option<bool>,
}
