//! HTTP handlers for the subscriber endpoints.

pub mod auth;
pub mod channels;
pub mod health;
pub mod magic_link;
pub mod subscribe;

use axum::http::HeaderMap;
use linkletter_core::{AppError, AppResult};
use linkletter_domain::ChannelId;

/// Parses client-supplied channel ids. A malformed id is rejected the same
/// way an unknown one is.
pub(crate) fn parse_channel_ids(ids: Option<Vec<String>>) -> AppResult<Option<Vec<ChannelId>>> {
    let Some(ids) = ids else {
        return Ok(None);
    };

    let mut parsed = Vec::with_capacity(ids.len());
    for id in ids {
        let uuid = uuid::Uuid::parse_str(&id)
            .map_err(|_| AppError::InvalidOptIns(id.clone()))?;
        parsed.push(ChannelId::from_uuid(uuid));
    }

    Ok(Some(parsed))
}

/// Raw `Cookie` header value, forwarded verbatim to the host auth gateway.
pub(crate) fn request_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::COOKIE)
        .and_then(|value| value.to_str().ok())
}
