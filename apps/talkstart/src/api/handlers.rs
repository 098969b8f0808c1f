//! # API Endpoint Handlers
//!
//! Each session route looks the session up by id, applies one wizard
//! action under the store's write lock, and answers with a fresh
//! [`SessionView`].

use super::{
    AppState,
    types::{
        AnswerRequest, CatalogResponse, FeedbackRequest, HealthResponse, SaveResponse,
        SelectRequest, SessionResponse, SessionView,
    },
};
use crate::error::AppError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use talkstart_core::{AgeGroupId, MilestoneId, ScreeningError, ScreeningSession};

type SessionReply = (StatusCode, Json<SessionResponse>);

/// HTTP status for a rejected wizard action.
fn status_for(error: &ScreeningError) -> StatusCode {
    match error {
        ScreeningError::InvalidSelection(_) | ScreeningError::InvalidFeedback(_) => {
            StatusCode::BAD_REQUEST
        }
        ScreeningError::OutOfSequenceAnswer { .. }
        | ScreeningError::InvalidTransition { .. }
        | ScreeningError::FeedbackAlreadySubmitted => StatusCode::CONFLICT,
    }
}

fn not_found(id: u64) -> SessionReply {
    (
        StatusCode::NOT_FOUND,
        Json(SessionResponse::error(format!("Session {} not found", id))),
    )
}

/// Apply `action` to session `id` and reply with the resulting view.
async fn transition<F>(state: &AppState, id: u64, action: F) -> SessionReply
where
    F: FnOnce(&mut ScreeningSession) -> Result<(), ScreeningError>,
{
    let mut sessions = state.sessions.write().await;
    let Some(session) = sessions.get_mut(id) else {
        return not_found(id);
    };

    match action(session) {
        Ok(()) => {
            tracing::debug!(session = id, phase = %session.phase(), "Session updated");
            (
                StatusCode::OK,
                Json(SessionResponse::success(SessionView::from_session(
                    id, session,
                ))),
            )
        }
        Err(e) => {
            tracing::debug!(session = id, error = %e, "Session action rejected");
            (status_for(&e), Json(SessionResponse::error(e.to_string())))
        }
    }
}

// =============================================================================
// READ-ONLY HANDLERS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// The age groups and questions this server screens against.
pub async fn catalog_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(CatalogResponse {
        groups: state.catalog.groups().to_vec(),
    })
}

/// Current state of a session.
pub async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(id) {
        Some(session) => (
            StatusCode::OK,
            Json(SessionResponse::success(SessionView::from_session(
                id, session,
            ))),
        ),
        None => not_found(id),
    }
}

// =============================================================================
// SESSION LIFECYCLE
// =============================================================================

/// Start a new session in the welcome phase.
pub async fn create_session_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut sessions = state.sessions.write().await;
    let id = match sessions.insert(state.new_session()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Refusing new session");
            let status = match e {
                AppError::SessionLimit(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            return (status, Json(SessionResponse::error(e.to_string())));
        }
    };

    tracing::info!(session = id, live = sessions.len(), "Session created");
    match sessions.get(id) {
        Some(session) => (
            StatusCode::CREATED,
            Json(SessionResponse::success(SessionView::from_session(
                id, session,
            ))),
        ),
        None => not_found(id),
    }
}

/// Discard a session. Replies with its last state.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let mut sessions = state.sessions.write().await;
    match sessions.remove(id) {
        Some(session) => {
            tracing::info!(session = id, live = sessions.len(), "Session deleted");
            (
                StatusCode::OK,
                Json(SessionResponse::success(SessionView::from_session(
                    id, &session,
                ))),
            )
        }
        None => not_found(id),
    }
}

// =============================================================================
// WIZARD TRANSITIONS
// =============================================================================

/// Welcome -> age selection.
pub async fn begin_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    transition(&state, id, ScreeningSession::begin).await
}

/// Age selection -> welcome.
pub async fn back_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    transition(&state, id, ScreeningSession::back).await
}

/// Choose an age group and start screening.
pub async fn select_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<SelectRequest>,
) -> impl IntoResponse {
    let group = AgeGroupId::new(request.age_group_id);
    transition(&state, id, |s| s.choose_age_group(&group)).await
}

/// Answer the current question.
pub async fn answer_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<AnswerRequest>,
) -> impl IntoResponse {
    let milestone = MilestoneId::new(request.milestone_id);
    transition(&state, id, |s| s.answer(&milestone, request.value).map(|_| ())).await
}

/// Results -> welcome.
pub async fn restart_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    transition(&state, id, ScreeningSession::restart).await
}

/// Leave feedback on the results.
pub async fn feedback_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<FeedbackRequest>,
) -> impl IntoResponse {
    transition(&state, id, |s| {
        s.submit_feedback(request.rating, request.comment)
    })
    .await
}

/// Export the results report. Repeatable; leaves the session unchanged.
pub async fn save_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    let Some(session) = sessions.get(id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(SaveResponse::error(format!("Session {} not found", id))),
        );
    };

    match session.save_results() {
        Ok(report) => (StatusCode::OK, Json(SaveResponse::success(report))),
        Err(e) => (status_for(&e), Json(SaveResponse::error(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talkstart_core::Phase;

    #[test]
    fn screening_errors_map_to_client_statuses() {
        assert_eq!(
            status_for(&ScreeningError::InvalidSelection(AgeGroupId::new("x"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ScreeningError::InvalidTransition {
                phase: Phase::Welcome,
                action: "restart",
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&ScreeningError::FeedbackAlreadySubmitted),
            StatusCode::CONFLICT
        );
    }
}
