use axum::Json;
use axum::extract::State;

use crate::dto::{OptInChannelDto, OptInChannelsResponse, now_iso};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /optinchannels - list the active opt-in channels.
pub async fn opt_in_channels_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<OptInChannelsResponse>> {
    let channels = state.opt_in_channel_service.list_active().await?;

    let opt_in_channels = channels
        .into_iter()
        .map(|channel| OptInChannelDto {
            id: channel.id.to_string(),
            title: channel.title,
            description: channel.description,
            slug: channel.slug,
        })
        .collect();

    Ok(Json(OptInChannelsResponse {
        opt_in_channels,
        now: now_iso(),
    }))
}
