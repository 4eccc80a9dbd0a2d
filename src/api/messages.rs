use crate::api::AppState;
use crate::api::schemas::messages::{
    MessageContentResponse, MessageInfoResponse, ReadMessage, UpdateContent, UpdatePassword,
};
use crate::domain::access::Caller;
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Returns the public metadata of a message.
///
/// # Errors
/// Returns `AppError::NotFound` if the message does not exist.
pub async fn get_info(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<MessageInfoResponse>> {
    let info = state.message_service.get_info(&Caller::anonymous(None), &message_id).await?;
    Ok(Json(info.into()))
}

/// Returns the content of a message, proving the password if it is protected.
///
/// The body is optional; a bare `POST` reads as `{}`.
///
/// # Errors
/// Returns `AppError::NotFound` if the message does not exist.
/// Returns `AppError::Unauthorized` if the password is missing or wrong.
pub async fn read(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    body: Option<Json<ReadMessage>>,
) -> Result<Json<MessageContentResponse>> {
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let caller = Caller::anonymous(body.password);
    let content = state.message_service.read(&caller, &message_id).await?;
    Ok(Json(content.into()))
}

/// Replaces the content of a message.
///
/// # Errors
/// Returns `AppError::NotFound` if the message does not exist.
/// Returns `AppError::Unauthorized` if the password is missing or wrong.
pub async fn update_content(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(body): Json<UpdateContent>,
) -> Result<Json<MessageContentResponse>> {
    let caller = Caller::anonymous(body.password);
    let content = state.message_service.update_content(&caller, &message_id, body.new_content).await?;
    Ok(Json(content.into()))
}

/// Rotates the password of a protected message.
///
/// # Errors
/// Returns `AppError::InvalidState` if the message has no password.
/// Returns `AppError::Unauthorized` if the current password is wrong.
pub async fn update_password(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(body): Json<UpdatePassword>,
) -> Result<impl IntoResponse> {
    let caller = Caller::anonymous(Some(body.current_password));
    state.message_service.rotate_password(&caller, &message_id, &body.new_password, body.new_hint).await?;
    Ok(StatusCode::NO_CONTENT)
}
