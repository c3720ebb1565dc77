// src/handlers/quiz.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        choice::Choice,
        question::{Question, QuestionSpec, QuestionType},
        quiz::{Quiz, QuizSummary, SetLiveRequest, TimerMode, UpsertQuizRequest},
    },
    utils::{html::clean_html, jwt::Claims},
};

/// Creates or updates a quiz together with its question set.
///
/// Create path (no id): inserts a draft quiz owned by the caller, then
/// its questions and choices in order.
///
/// Update path (id): updates the quiz's scalar fields, then performs a
/// full destructive replace of the question set - all existing questions
/// are deleted (cascading to choices) and the supplied list is inserted
/// as new rows. Client-supplied question ids are not reconciled. The
/// whole replace runs in one transaction so a failure mid-way cannot
/// leave the quiz with zero questions.
pub async fn upsert_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpsertQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::Validation(validation_errors.to_string()));
    }
    let mode = payload.validate_timer_rules()?;

    let creator_id = claims.user_id();
    if creator_id == 0 {
        return Err(AppError::Authorization(
            "A signed-in creator is required".to_string(),
        ));
    }

    let title = payload.title.trim().to_string();
    let description = payload.description.as_deref().map(clean_html);
    // The quiz-wide timer only applies in global mode.
    let timer_seconds = match mode {
        TimerMode::Global => payload.timer_seconds,
        _ => None,
    };

    let mut tx = pool.begin().await?;

    let (quiz_id, created, message) = match payload.id {
        Some(id) => {
            // Ownership is part of the lookup so foreign ids read as absent.
            let owned = sqlx::query_scalar::<_, i64>(
                "SELECT id FROM quizzes WHERE id = $1 AND created_by = $2",
            )
            .bind(id)
            .bind(creator_id)
            .fetch_optional(&mut *tx)
            .await?;

            if owned.is_none() {
                return Err(AppError::NotFound("Quiz not found".to_string()));
            }

            sqlx::query(
                r#"
                UPDATE quizzes
                SET title = $1, description = $2, timer_mode = $3, timer_seconds = $4,
                    shuffle_questions = $5, status = COALESCE($6, status),
                    scheduled_at = $7, updated_at = NOW()
                WHERE id = $8
                "#,
            )
            .bind(&title)
            .bind(&description)
            .bind(mode.as_str())
            .bind(timer_seconds)
            .bind(payload.shuffle_questions)
            .bind(&payload.status)
            .bind(payload.scheduled_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            // Destructive replace: drop every question (choices cascade).
            sqlx::query("DELETE FROM questions WHERE quiz_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            (id, false, "Quiz updated")
        }
        None => {
            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO quizzes
                (public_id, title, description, timer_mode, timer_seconds,
                 shuffle_questions, status, is_live, scheduled_at, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8, $9)
                RETURNING id
                "#,
            )
            .bind(uuid::Uuid::new_v4())
            .bind(&title)
            .bind(&description)
            .bind(mode.as_str())
            .bind(timer_seconds)
            .bind(payload.shuffle_questions)
            .bind(payload.status.as_deref().unwrap_or("draft"))
            .bind(payload.scheduled_at)
            .bind(creator_id)
            .fetch_one(&mut *tx)
            .await?;

            (id, true, "Quiz created")
        }
    };

    insert_questions(&mut tx, quiz_id, &payload.questions).await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to commit quiz upsert: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(serde_json::json!({ "id": quiz_id, "message": message })),
    ))
}

/// Inserts the supplied question list (and choices) for a quiz, in order.
async fn insert_questions(
    tx: &mut Transaction<'_, Postgres>,
    quiz_id: i64,
    questions: &[QuestionSpec],
) -> Result<(), AppError> {
    for (position, spec) in questions.iter().enumerate() {
        let question_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions
            (quiz_id, position, question_type, text, timer_seconds, points,
             correct_bool, explanation, correct_answer, accepted_answers, guidelines)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(quiz_id)
        .bind(position as i32)
        .bind(spec.question_type.as_str())
        .bind(clean_html(&spec.text))
        .bind(spec.timer_seconds)
        .bind(spec.points)
        .bind(spec.correct_bool)
        .bind(&spec.explanation)
        .bind(&spec.correct_answer)
        .bind(&spec.accepted_answers)
        .bind(spec.guidelines.as_deref().map(clean_html))
        .fetch_one(&mut **tx)
        .await?;

        if spec.question_type == QuestionType::MultipleChoice {
            for (choice_position, choice) in spec.choices.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO choices (question_id, position, text, is_correct)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(question_id)
                .bind(choice_position as i32)
                .bind(choice.text.trim())
                .bind(choice.is_correct)
                .execute(&mut **tx)
                .await?;
            }
        }
    }

    Ok(())
}

/// Deletes a quiz; questions, choices and attempts cascade away.
///
/// Idempotent: deleting an id that no longer exists (or was never owned
/// by the caller) is not distinguished from success.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM quizzes WHERE id = $1 AND created_by = $2")
        .bind(id)
        .bind(claims.user_id())
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz: {:?}", e);
            AppError::Internal(e.to_string())
        })?;

    Ok(Json(serde_json::json!({ "message": "Quiz deleted" })))
}

/// Flips the liveness flag - the sole gate controlling whether the
/// public quiz-taking route serves the taking form or an offline state.
/// Taking a quiz offline marks its display status 'paused'.
pub async fn set_quiz_live(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SetLiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE quizzes
        SET is_live = $1,
            status = CASE WHEN $1 THEN status ELSE 'paused' END,
            updated_at = NOW()
        WHERE id = $2 AND created_by = $3
        "#,
    )
    .bind(payload.is_live)
    .bind(id)
    .bind(claims.user_id())
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to set quiz liveness: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(Json(serde_json::json!({
        "id": id,
        "is_live": payload.is_live,
        "message": if payload.is_live { "Quiz is now live" } else { "Quiz taken offline" },
    })))
}

/// Full question row plus its choices, for the authoring read side.
#[derive(Debug, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// Returns one quiz with its full nested question set. Owner only.
pub async fn get_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT * FROM quizzes WHERE id = $1 AND created_by = $2",
    )
    .bind(id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.* FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.quiz_id = $1
        ORDER BY c.question_id, c.position
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;

    let details: Vec<QuestionDetail> = questions
        .into_iter()
        .map(|question| {
            let choices = choices
                .iter()
                .filter(|c| c.question_id == question.id)
                .cloned()
                .collect();
            QuestionDetail { question, choices }
        })
        .collect();

    let code = crate::utils::short_id::encode(quiz.public_id);

    Ok(Json(serde_json::json!({
        "quiz": quiz,
        "questions": details,
        "code": code,
    })))
}

/// Lists the caller's quizzes with their question counts.
pub async fn list_quizzes(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let quizzes = sqlx::query_as::<_, QuizSummary>(
        r#"
        SELECT qz.id, qz.public_id, qz.title, qz.status, qz.is_live,
               COUNT(qn.id) AS question_count, qz.updated_at
        FROM quizzes qz
        LEFT JOIN questions qn ON qn.quiz_id = qz.id
        WHERE qz.created_by = $1
        GROUP BY qz.id
        ORDER BY qz.updated_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list quizzes: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    Ok(Json(quizzes))
}
