// src/handlers/report.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::report::{AnswerStat, AttemptStat, DashboardSummary, QuizReport},
    utils::jwt::Claims,
};

/// Derives per-quiz statistics from already-fetched attempt rows.
///
/// Accuracy averages awarded/max points over graded answers only
/// (ungraded open-ended answers carry `is_correct = NULL` and stay out
/// of the denominator). Completion averages answered/total questions
/// over all attempts. Zero attempts yield all-zero numbers and no
/// last-attempt time; every denominator is guarded.
fn compute_quiz_report(
    quiz_id: i64,
    title: String,
    question_count: i64,
    attempts: &[AttemptStat],
    answers: &[AnswerStat],
) -> QuizReport {
    let participant_count = attempts
        .iter()
        .map(|a| a.participant_id)
        .collect::<HashSet<_>>()
        .len() as i64;

    let graded: Vec<&AnswerStat> = answers.iter().filter(|a| a.is_correct.is_some()).collect();
    let accuracy = if graded.is_empty() {
        0.0
    } else {
        let sum: f64 = graded
            .iter()
            .filter(|a| a.max_points > 0)
            .map(|a| a.points_awarded as f64 / a.max_points as f64)
            .sum();
        sum / graded.len() as f64 * 100.0
    };

    let completion_rate = if attempts.is_empty() || question_count == 0 {
        0.0
    } else {
        let mut answered_per_attempt: HashMap<i64, i64> = HashMap::new();
        for answer in answers {
            *answered_per_attempt.entry(answer.attempt_id).or_insert(0) += 1;
        }
        let sum: f64 = attempts
            .iter()
            .map(|a| {
                let answered = answered_per_attempt.get(&a.id).copied().unwrap_or(0);
                answered as f64 / question_count as f64
            })
            .sum();
        sum / attempts.len() as f64 * 100.0
    };

    let last_attempt = attempts.iter().filter_map(|a| a.submitted_at).max();

    QuizReport {
        quiz_id,
        title,
        participant_count,
        accuracy,
        completion_rate,
        last_attempt,
    }
}

/// Dashboard rollup: the arithmetic mean of each quiz's already-computed
/// accuracy and completion rate (mean of means), with a max(count, 1)
/// denominator so an empty quiz list yields zeros.
fn rollup(reports: &[QuizReport]) -> (f64, f64) {
    let count = reports.len().max(1) as f64;
    let accuracy = reports.iter().map(|r| r.accuracy).sum::<f64>() / count;
    let completion = reports.iter().map(|r| r.completion_rate).sum::<f64>() / count;
    (accuracy, completion)
}

async fn load_quiz_report(
    pool: &PgPool,
    quiz_id: i64,
    title: String,
) -> Result<QuizReport, AppError> {
    let question_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE quiz_id = $1")
            .bind(quiz_id)
            .fetch_one(pool)
            .await?;

    let attempts = sqlx::query_as::<_, AttemptStat>(
        "SELECT id, participant_id, submitted_at FROM attempts WHERE quiz_id = $1",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let answers = sqlx::query_as::<_, AnswerStat>(
        r#"
        SELECT aa.attempt_id, aa.points_awarded, q.points AS max_points, aa.is_correct
        FROM attempt_answers aa
        JOIN questions q ON q.id = aa.question_id
        JOIN attempts a ON a.id = aa.attempt_id
        WHERE a.quiz_id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    Ok(compute_quiz_report(
        quiz_id,
        title,
        question_count,
        &attempts,
        &answers,
    ))
}

/// Per-quiz report for the quiz's creator.
pub async fn quiz_report(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let title = sqlx::query_scalar::<_, String>(
        "SELECT title FROM quizzes WHERE id = $1 AND created_by = $2",
    )
    .bind(id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let report = load_quiz_report(&pool, id, title).await?;

    Ok(Json(report))
}

/// Dashboard summary across all of the caller's quizzes.
pub async fn dashboard(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, title FROM quizzes WHERE created_by = $1 ORDER BY id",
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch dashboard quizzes: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let mut reports = Vec::with_capacity(quizzes.len());
    for (id, title) in quizzes {
        reports.push(load_quiz_report(&pool, id, title).await?);
    }

    let total_participants = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT a.participant_id)
        FROM attempts a
        JOIN quizzes qz ON qz.id = a.quiz_id
        WHERE qz.created_by = $1
        "#,
    )
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await?;

    let (average_accuracy, average_completion_rate) = rollup(&reports);

    Ok(Json(serde_json::json!({
        "summary": DashboardSummary {
            quiz_count: reports.len() as i64,
            total_participants,
            average_accuracy,
            average_completion_rate,
        },
        "quizzes": reports,
    })))
}
