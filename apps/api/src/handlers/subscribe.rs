use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use linkletter_application::{SubscribeOutcome, SubscribeRequest};
use linkletter_domain::EmailAddress;

use crate::dto::{
    MessageResponse, SubscribeApiRequest, SubscribeEmailResponse, SubscribeUpdateResponse,
    UnsubscribeRequest, now_iso,
};
use crate::error::{ApiJson, ApiResult};
use crate::handlers::{parse_channel_ids, request_cookie};
use crate::state::AppState;

/// POST /subscribe - create, re-verify, or update a subscription.
pub async fn subscribe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<SubscribeApiRequest>,
) -> ApiResult<Response> {
    let email = EmailAddress::new(payload.email)?;
    let opt_ins = parse_channel_ids(payload.opt_ins)?;

    let session = state
        .auth_gateway
        .authenticate(request_cookie(&headers))
        .await?;
    let authenticated_email = session.map(|session| session.email);

    let outcome = state
        .subscription_service
        .subscribe(SubscribeRequest {
            email,
            opt_ins,
            verify_url: payload.verify_url,
            subject: payload.subject,
            message: payload.message,
            first_name: payload.first_name,
            source: payload.source,
            authenticated_email,
        })
        .await?;

    let response = match outcome {
        SubscribeOutcome::VerificationEmailSent(receipt) => Json(SubscribeEmailResponse {
            email_result: receipt,
            now: now_iso(),
        })
        .into_response(),
        SubscribeOutcome::OptInsUpdated { email, opt_ins } => Json(SubscribeUpdateResponse {
            email: email.to_string(),
            opt_ins: opt_ins.iter().map(ToString::to_string).collect(),
            now: now_iso(),
        })
        .into_response(),
    };

    Ok(response)
}

/// POST /unsubscribe - validate the signed unsubscribe token and opt the
/// subscriber out.
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<UnsubscribeRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = EmailAddress::new(payload.email)?;

    let session = state
        .auth_gateway
        .authenticate(request_cookie(&headers))
        .await?;
    let authenticated_email = session.map(|session| session.email);

    state
        .subscription_service
        .unsubscribe(&email, &payload.unsubscribe_token, authenticated_email.as_ref())
        .await?;

    Ok(Json(MessageResponse {
        message: format!("{email} has been unsubscribed"),
        now: now_iso(),
    }))
}
