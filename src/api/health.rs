use crate::api::MgmtState;
use crate::api::schemas::health::HealthResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe: checks the message store and blob storage.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let (db_res, storage_res) = tokio::join!(state.health_service.check_db(), state.health_service.check_storage());

    let db_status = component_status("database", db_res);
    let storage_status = component_status("storage", storage_res);
    let ready = db_status == "ok" && storage_status == "ok";

    let response = HealthResponse {
        status: if ready { "ok" } else { "error" }.to_string(),
        database: db_status.to_string(),
        storage: storage_status.to_string(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(response))
}

fn component_status(component: &str, result: Result<(), String>) -> &'static str {
    if let Err(e) = result {
        tracing::warn!(error = %e, component = %component, "Readiness probe failed");
        "error"
    } else {
        "ok"
    }
}
