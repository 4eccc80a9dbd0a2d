use crate::api::AppState;
use crate::domain::access::Caller;
use crate::error::AppError;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Claims the API gateway signs into the admin header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayClaims {
    pub sub: String,
    pub projects: Vec<String>,
    pub exp: usize,
}

/// Decodes and validates a gateway token.
///
/// # Errors
/// Returns `AppError::Unauthorized` if the signature, algorithm or expiry is invalid.
pub fn verify_gateway_token(token: &str, secret: &str) -> Result<GatewayClaims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<GatewayClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "Gateway token rejected");
            AppError::Unauthorized
        })
}

/// An administrator acting on the `projectId` in the request path.
#[derive(Debug)]
pub struct AdminCaller(pub Caller);

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(state.config.gateway.jwt_header.as_str())
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let claims = verify_gateway_token(token, &state.config.gateway.jwt_secret)?;

        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let project_id = params.get("projectId").ok_or(AppError::NotFound)?;

        if !claims.projects.iter().any(|p| p == project_id) {
            tracing::warn!(subject = %claims.sub, project_id = %project_id, "Gateway subject not entitled to project");
            return Err(AppError::Forbidden);
        }

        tracing::Span::current().record("admin_subject", claims.sub.as_str());
        Ok(Self(Caller::admin(project_id.as_str())))
    }
}
