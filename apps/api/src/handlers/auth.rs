use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::dto::{MessageResponse, SubscriberAuthEmptyResponse, SubscriberAuthResponse, now_iso};
use crate::error::ApiResult;
use crate::handlers::request_cookie;
use crate::state::AppState;

/// POST /subscriberAuth - resolve the authenticated subscriber from the
/// request cookies.
///
/// No session resolves to a 400 with `{subscriber: null, now}` rather than an
/// error envelope, so clients can poll it as an auth check.
pub async fn subscriber_auth_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let session = state
        .auth_gateway
        .authenticate(request_cookie(&headers))
        .await?;

    let response = match session {
        Some(session) => Json(SubscriberAuthResponse {
            subscriber: session.subscriber,
            permissions: session.permissions,
            now: now_iso(),
        })
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(SubscriberAuthEmptyResponse {
                subscriber: Value::Null,
                now: now_iso(),
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// POST /logout - delegate logout to the host and relay its message.
pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<MessageResponse>> {
    let message = state
        .auth_gateway
        .logout(request_cookie(&headers))
        .await?;

    Ok(Json(MessageResponse {
        message,
        now: now_iso(),
    }))
}
