// src/handlers/attempt.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        attempt::{AnswerResult, AnswerSubmission, Attempt, SubmitAttemptRequest,
                  SubmitAttemptResponse},
        choice::Choice,
        question::{Question, QuestionType},
        quiz::Quiz,
    },
    utils::{jwt::Claims, short_id},
};

/// Starts an attempt against a live quiz, resolved by its public code.
///
/// The returned `started_at` is the anchor for the client-side countdown
/// (remaining = duration - (now - started_at), recomputed each tick).
pub async fn start_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let public_id = short_id::decode(&code)?;

    let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE public_id = $1")
        .bind(public_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if !quiz.is_live {
        return Err(AppError::Conflict(
            "Quiz is not currently accepting attempts".to_string(),
        ));
    }

    let attempt = sqlx::query_as::<_, Attempt>(
        r#"
        INSERT INTO attempts (quiz_id, participant_id, started_at)
        VALUES ($1, $2, NOW())
        RETURNING id, quiz_id, participant_id, started_at, submitted_at, score
        "#,
    )
    .bind(quiz.id)
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to start attempt: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "attempt_id": attempt.id,
            "started_at": attempt.started_at,
            "timer_mode": quiz.timer_mode,
            "timer_seconds": quiz.timer_seconds,
        })),
    ))
}

/// Grades one submitted answer against its question's variant rule.
///
/// Returns (correctness, points awarded). Correctness is None for
/// answers that cannot be machine-graded (open-ended), which keeps them
/// out of the accuracy denominator in reports.
fn grade_answer(
    question: &Question,
    choices: &[Choice],
    answer: &AnswerSubmission,
) -> (Option<bool>, i32) {
    let correct = match QuestionType::parse(&question.question_type) {
        Some(QuestionType::MultipleChoice) => {
            let picked = answer
                .choice_id
                .and_then(|id| choices.iter().find(|c| c.id == id && c.question_id == question.id));
            Some(picked.is_some_and(|c| c.is_correct))
        }
        Some(QuestionType::TrueFalse) => Some(
            answer.answer_bool.is_some() && answer.answer_bool == question.correct_bool,
        ),
        Some(QuestionType::FillInBlank) => {
            let submitted = normalize(answer.answer_text.as_deref().unwrap_or(""));
            if submitted.is_empty() {
                Some(false)
            } else {
                let canonical = question
                    .correct_answer
                    .as_deref()
                    .map(normalize)
                    .is_some_and(|a| a == submitted);
                let alternate = question
                    .accepted_answers
                    .as_deref()
                    .unwrap_or("")
                    .split(',')
                    .map(normalize)
                    .any(|a| !a.is_empty() && a == submitted);
                Some(canonical || alternate)
            }
        }
        // Open-ended answers are recorded ungraded with zero points,
        // pending manual review.
        Some(QuestionType::OpenEnded) => None,
        None => None,
    };

    let awarded = if correct == Some(true) {
        question.points
    } else {
        0
    };
    (correct, awarded)
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Submits an attempt: grades every answer, totals the score and seals
/// the attempt. Re-submission fails with Conflict; the record is
/// immutable afterwards. The countdown timer is advisory only - late
/// submissions are not rejected here.
pub async fn submit_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = sqlx::query_as::<_, Attempt>("SELECT * FROM attempts WHERE id = $1")
        .bind(attempt_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Attempt not found".to_string()))?;

    if attempt.participant_id != claims.user_id() {
        return Err(AppError::Authorization(
            "This attempt belongs to another participant".to_string(),
        ));
    }
    if attempt.submitted_at.is_some() {
        return Err(AppError::Conflict(
            "Attempt has already been submitted".to_string(),
        ));
    }

    // Exactly one answer per question.
    let mut seen = HashSet::new();
    for answer in &req.answers {
        if !seen.insert(answer.question_id) {
            return Err(AppError::Validation(format!(
                "Question {} was answered more than once",
                answer.question_id
            )));
        }
    }

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position",
    )
    .bind(attempt.quiz_id)
    .fetch_all(&pool)
    .await?;

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.* FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.quiz_id = $1
        "#,
    )
    .bind(attempt.quiz_id)
    .fetch_all(&pool)
    .await?;

    let question_map: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();

    let mut results = Vec::with_capacity(req.answers.len());
    let mut score = 0;
    let mut tx = pool.begin().await?;

    for answer in &req.answers {
        let question = question_map.get(&answer.question_id).ok_or_else(|| {
            AppError::Validation(format!(
                "Question {} does not belong to this quiz",
                answer.question_id
            ))
        })?;

        let question_choices: Vec<Choice> = choices
            .iter()
            .filter(|c| c.question_id == question.id)
            .cloned()
            .collect();

        let (is_correct, points_awarded) = grade_answer(question, &question_choices, answer);
        score += points_awarded;

        sqlx::query(
            r#"
            INSERT INTO attempt_answers
            (attempt_id, question_id, choice_id, answer_text, is_correct, points_awarded)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(attempt_id)
        .bind(answer.question_id)
        .bind(answer.choice_id)
        .bind(&answer.answer_text)
        .bind(is_correct)
        .bind(points_awarded)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            // A concurrent submit already wrote this (attempt, question) pair.
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                AppError::Conflict("Attempt has already been submitted".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        results.push(AnswerResult {
            question_id: answer.question_id,
            is_correct,
            points_awarded,
            max_points: question.points,
        });
    }

    // The NULL guard makes sealing atomic: of two racing submits, only
    // the first can flip submitted_at, so the earlier read-side check
    // cannot be slipped past between read and write.
    let submitted_at = Utc::now();
    let sealed = sqlx::query(
        "UPDATE attempts SET submitted_at = $1, score = $2 WHERE id = $3 AND submitted_at IS NULL",
    )
    .bind(submitted_at)
    .bind(score)
    .bind(attempt_id)
    .execute(&mut *tx)
    .await?;

    if sealed.rows_affected() == 0 {
        return Err(AppError::Conflict(
            "Attempt has already been submitted".to_string(),
        ));
    }

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit attempt submission: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let max_score = questions.iter().map(|q| q.points).sum();

    Ok(Json(SubmitAttemptResponse {
        attempt_id,
        score,
        max_score,
        submitted_at,
        results,
    }))
}
