// src/handlers/play.rs

use axum::{Json, extract::{Path, State}, response::IntoResponse};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        choice::Choice,
        question::{PublicChoice, PublicQuestion, Question},
        quiz::Quiz,
    },
    utils::short_id,
};

/// What the public quiz-taking route shows for a quiz right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Live: the taking form is served.
    Taking,
    OfflineDraft,
    OfflineScheduled,
    OfflinePaused,
    OfflineEnded,
    /// Generic offline message for anything unrecognized.
    Offline,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Taking => "taking",
            GateState::OfflineDraft => "offline-draft",
            GateState::OfflineScheduled => "offline-scheduled",
            GateState::OfflinePaused => "offline-paused",
            GateState::OfflineEnded => "offline-ended",
            GateState::Offline => "offline",
        }
    }
}

/// Resolves the presentation state for the public route.
///
/// Pure and total: every input combination yields exactly one state.
/// `Taking` iff the quiz is live; otherwise the stored display status
/// maps to its offline variant, falling back to a generic offline state.
/// A quiz marked scheduled only reads as scheduled while the scheduled
/// start is still in the future.
pub fn resolve_gate(
    status: &str,
    is_live: bool,
    scheduled_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> GateState {
    if is_live {
        return GateState::Taking;
    }

    match status {
        "draft" => GateState::OfflineDraft,
        "scheduled" => match scheduled_at {
            Some(at) if at > now => GateState::OfflineScheduled,
            _ => GateState::Offline,
        },
        "paused" => GateState::OfflinePaused,
        "ended" => GateState::OfflineEnded,
        _ => GateState::Offline,
    }
}

/// Public quiz view, keyed by the short code. No authentication.
///
/// When live, serves the participant-facing quiz: questions without any
/// correct-answer material and choices without their correctness flags.
/// Question order is randomized server-side when the shuffle flag is set.
pub async fn view_quiz(
    State(pool): State<PgPool>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let public_id = short_id::decode(&code)?;

    let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE public_id = $1")
        .bind(public_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let gate = resolve_gate(&quiz.status, quiz.is_live, quiz.scheduled_at, Utc::now());

    if gate != GateState::Taking {
        return Ok(Json(serde_json::json!({
            "state": gate.as_str(),
            "title": quiz.title,
            "scheduled_at": quiz.scheduled_at,
        })));
    }

    let order = if quiz.shuffle_questions {
        "RANDOM()"
    } else {
        "position"
    };
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY {}",
        order
    ))
    .bind(quiz.id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz questions: {:?}", e);
        AppError::Internal(e.to_string())
    })?;

    let choices = sqlx::query_as::<_, Choice>(
        r#"
        SELECT c.* FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE q.quiz_id = $1
        ORDER BY c.question_id, c.position
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    // Strip correct-answer material before anything leaves the server.
    let public_questions: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| {
            let public_choices = choices
                .iter()
                .filter(|c| c.question_id == q.id)
                .map(|c| PublicChoice {
                    id: c.id,
                    text: c.text.clone(),
                })
                .collect();
            PublicQuestion {
                id: q.id,
                question_type: q.question_type,
                text: q.text,
                timer_seconds: q.timer_seconds,
                points: q.points,
                choices: public_choices,
            }
        })
        .collect();

    Ok(Json(serde_json::json!({
        "state": gate.as_str(),
        "quiz": {
            "title": quiz.title,
            "description": quiz.description,
            "timer_mode": quiz.timer_mode,
            "timer_seconds": quiz.timer_seconds,
            "shuffle_questions": quiz.shuffle_questions,
        },
        "questions": public_questions,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn live_always_resolves_to_taking() {
        let now = Utc::now();
        for status in ["draft", "scheduled", "paused", "ended", "whatever"] {
            assert_eq!(resolve_gate(status, true, None, now), GateState::Taking);
        }
    }

    #[test]
    fn offline_maps_status_to_variant() {
        let now = Utc::now();
        assert_eq!(resolve_gate("draft", false, None, now), GateState::OfflineDraft);
        assert_eq!(resolve_gate("paused", false, None, now), GateState::OfflinePaused);
        assert_eq!(resolve_gate("ended", false, None, now), GateState::OfflineEnded);
    }

    #[test]
    fn scheduled_depends_on_start_time() {
        let now = Utc::now();
        let future = Some(now + Duration::hours(1));
        let past = Some(now - Duration::hours(1));

        assert_eq!(
            resolve_gate("scheduled", false, future, now),
            GateState::OfflineScheduled
        );
        assert_eq!(resolve_gate("scheduled", false, past, now), GateState::Offline);
        assert_eq!(resolve_gate("scheduled", false, None, now), GateState::Offline);
    }

    #[test]
    fn unrecognized_status_falls_back_to_generic_offline() {
        let now = Utc::now();
        assert_eq!(resolve_gate("archived", false, None, now), GateState::Offline);
        assert_eq!(resolve_gate("", false, None, now), GateState::Offline);
    }
}
