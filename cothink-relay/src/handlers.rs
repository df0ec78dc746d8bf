use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cothink_providers::{ProviderError, RelayRequest};
use serde_json::json;

use crate::state::AppState;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub async fn chat_handler(State(state): State<AppState>, body: Bytes) -> Response {
    if !state.upstream.has_api_key() {
        tracing::error!("Rejecting chat request, upstream API key is not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "OPENROUTER_API_KEY not configured",
        );
    }

    let request: RelayRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Invalid chat request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e));
        }
    };

    let messages = request.upstream_messages(&state.personas, &state.prompt);
    tracing::info!(
        "Sending to OpenRouter: persona={}, messages={}, has_history={}",
        state.personas.name_for_model(&request.model),
        messages.len(),
        !request.message_history.is_empty()
    );

    match state.upstream.complete(&request.model, messages).await {
        Ok(value) => {
            tracing::info!("OpenRouter replied for model {}", request.model);
            (StatusCode::OK, Json(value)).into_response()
        }
        Err(e @ ProviderError::ApiError(_)) => {
            tracing::error!("OpenRouter error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!("Relay request failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", e),
            )
        }
    }
}
