use crate::api::AppState;
use crate::api::middleware::AdminCaller;
use crate::api::schemas::messages::{
    AdminMessageResponse, CreateMessage, DeletedResponse, MessageInfoResponse, UpdateMessage,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Lists message metadata for a project, oldest first.
///
/// # Errors
/// Returns `AppError::Unauthorized` or `AppError::Forbidden` if the gateway check fails.
pub async fn list(
    AdminCaller(caller): AdminCaller,
    State(state): State<AppState>,
) -> Result<Json<Vec<MessageInfoResponse>>> {
    let messages = state.message_service.list(&caller).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

/// Creates a message in a project.
///
/// # Errors
/// Returns `AppError::Conflict` if the requested ID is taken.
/// Returns `AppError::BadRequest` for an empty ID or password.
pub async fn create(
    AdminCaller(caller): AdminCaller,
    State(state): State<AppState>,
    Json(body): Json<CreateMessage>,
) -> Result<impl IntoResponse> {
    let message = state.message_service.create(&caller, body.into()).await?;
    Ok((StatusCode::CREATED, Json(AdminMessageResponse::from(message))))
}

/// Applies a keep/clear/set update to a message.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is not in the project.
pub async fn update(
    AdminCaller(caller): AdminCaller,
    State(state): State<AppState>,
    Path((_project_id, message_id)): Path<(String, String)>,
    Json(body): Json<UpdateMessage>,
) -> Result<Json<AdminMessageResponse>> {
    let message = state.message_service.update(&caller, &message_id, body.into()).await?;
    Ok(Json(message.into()))
}

/// Deletes a message and its image.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is not in the project.
pub async fn delete(
    AdminCaller(caller): AdminCaller,
    State(state): State<AppState>,
    Path((_project_id, message_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    state.message_service.delete(&caller, &message_id).await?;
    state.image_service.discard(std::slice::from_ref(&message_id)).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes every message of a project along with their images.
///
/// # Errors
/// Returns `AppError::Database` if the store fails.
pub async fn delete_project(
    AdminCaller(caller): AdminCaller,
    State(state): State<AppState>,
) -> Result<Json<DeletedResponse>> {
    let ids = state.message_service.delete_for_project(&caller).await?;
    state.image_service.discard(&ids).await;
    Ok(Json(DeletedResponse { deleted: ids.len() }))
}
