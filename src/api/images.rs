use crate::api::AppState;
use crate::domain::access::Caller;
use crate::error::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;

pub const PASSWORD_HEADER: &str = "x-message-password";

fn caller_from(headers: &HeaderMap) -> Caller {
    let password = headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok()).map(str::to_owned);
    Caller::anonymous(password)
}

/// Stores the image of a message after proving its password.
///
/// # Errors
/// Returns `AppError::Unauthorized` if the password check fails.
/// Returns `AppError::BadRequest` if the image exceeds the size limit.
pub async fn upload(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse> {
    let content_len =
        headers.get(header::CONTENT_LENGTH).and_then(|v| v.to_str().map_or(None, |s| s.parse::<usize>().ok()));

    // Bridge Axum Body -> StorageStream
    let stream = body.into_data_stream().map(|res| res.map_err(|e| std::io::Error::other(e.to_string()))).boxed();

    state.image_service.upload(&caller_from(&headers), &message_id, content_len, stream).await?;
    Ok(StatusCode::CREATED)
}

/// Streams the image of a message.
///
/// # Errors
/// Returns `AppError::NotFound` if the message or image does not exist.
/// Returns `AppError::Unauthorized` if the password check fails.
pub async fn download(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let (content_length, stream) = state.image_service.download(&caller_from(&headers), &message_id).await?;

    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    if content_length > 0 {
        response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    }

    Ok(response)
}
