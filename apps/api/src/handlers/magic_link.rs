use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use linkletter_application::MagicLinkRequest;
use linkletter_core::AppError;
use linkletter_domain::EmailAddress;

use crate::dto::{
    EmailTokenRequest, EmailTokenResponse, VerifyTokenRequest, VerifyTokenResponse, now_iso,
};
use crate::error::{ApiJson, ApiResult};
use crate::handlers::parse_channel_ids;
use crate::state::AppState;

/// POST /emailToken - mint a magic-link token and email it.
pub async fn email_token_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EmailTokenRequest>,
) -> ApiResult<Json<EmailTokenResponse>> {
    let email = EmailAddress::new(payload.email)?;
    let opt_ins = parse_channel_ids(payload.opt_ins)?;

    let receipt = state
        .magic_link_service
        .request_magic_link(MagicLinkRequest {
            email,
            verify_url: payload.verify_url,
            forward_url: payload.forward_url,
            subject: payload.subject,
            message: payload.message,
            opt_ins,
            first_name: payload.first_name,
            source: payload.source,
        })
        .await?;

    Ok(Json(EmailTokenResponse {
        email_result: receipt,
        now: now_iso(),
    }))
}

/// POST /verifyToken - consume a magic-link token and establish a session.
///
/// The host's session-establishing headers are forwarded verbatim on the
/// success response so its cookies reach the client.
pub async fn verify_token_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyTokenRequest>,
) -> ApiResult<Response> {
    let email = EmailAddress::new(payload.email)?;

    let session_headers = state
        .magic_link_service
        .verify_magic_link(&email, &payload.token)
        .await?;

    let mut response = Json(VerifyTokenResponse {
        message: "Token verified".to_owned(),
        now: now_iso(),
    })
    .into_response();

    for (name, value) in session_headers {
        let name = axum::http::HeaderName::from_bytes(name.as_bytes()).map_err(|error| {
            AppError::Internal(format!("invalid session header name '{name}': {error}"))
        })?;
        let value = axum::http::HeaderValue::from_str(&value).map_err(|error| {
            AppError::Internal(format!("invalid session header value: {error}"))
        })?;
        response.headers_mut().append(name, value);
    }

    Ok(response)
}
