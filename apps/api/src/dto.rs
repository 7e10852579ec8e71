//! Wire-format request and response payloads.
//!
//! The wire format is camelCase JSON; every response carries the server time
//! as an ISO-8601 `now` field.

use chrono::{SecondsFormat, Utc};
use linkletter_application::EmailReceipt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ISO-8601 server timestamp included in every response body.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTokenRequest {
    pub email: String,
    pub verify_url: Option<String>,
    pub forward_url: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub opt_ins: Option<Vec<String>>,
    pub first_name: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTokenResponse {
    pub email_result: EmailReceipt,
    pub now: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenResponse {
    pub message: String,
    pub now: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeApiRequest {
    pub email: String,
    pub opt_ins: Option<Vec<String>>,
    pub verify_url: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub first_name: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeEmailResponse {
    pub email_result: EmailReceipt,
    pub now: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeUpdateResponse {
    pub email: String,
    pub opt_ins: Vec<String>,
    pub now: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    pub email: String,
    pub unsubscribe_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
    pub now: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberAuthResponse {
    pub subscriber: Value,
    pub permissions: Value,
    pub now: String,
}

/// Body of the 400 response when no session cookie resolves to a subscriber.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberAuthEmptyResponse {
    pub subscriber: Value,
    pub now: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptInChannelDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptInChannelsResponse {
    pub opt_in_channels: Vec<OptInChannelDto>,
    pub now: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
