//! Opt-in channel validation.
//!
//! Requested channel ids are checked against the active channel set before
//! any mutating operation writes opt-ins, including subscriber creation;
//! client-supplied ids are never trusted.

use std::sync::Arc;

use linkletter_core::{AppError, AppResult};
use linkletter_domain::{ChannelId, OptInChannel};

use crate::ports::OptInChannelRepository;

/// Result of validating requested channel ids.
///
/// Both fields are `None` when no ids were requested: absence of input opts
/// out of channel validation entirely, which is not the same as rejecting
/// everything.
#[derive(Debug, Clone, Default)]
pub struct OptInVerification {
    /// Requested ids that matched active channels.
    pub verified: Option<Vec<ChannelId>>,
    /// Requested ids that matched nothing.
    pub invalid: Option<Vec<ChannelId>>,
}

/// Application service for opt-in channel validation and listing.
#[derive(Clone)]
pub struct OptInChannelService {
    channels: Arc<dyn OptInChannelRepository>,
}

impl OptInChannelService {
    /// Creates a new opt-in channel service.
    #[must_use]
    pub fn new(channels: Arc<dyn OptInChannelRepository>) -> Self {
        Self { channels }
    }

    /// Validates requested channel ids against the active channel set.
    pub async fn verify(&self, requested: Option<&[ChannelId]>) -> AppResult<OptInVerification> {
        let Some(requested) = requested else {
            return Ok(OptInVerification::default());
        };

        let matched = self.channels.find_active_by_ids(requested).await?;
        let verified: Vec<ChannelId> = matched.iter().map(|channel| channel.id).collect();

        let invalid: Vec<ChannelId> = requested
            .iter()
            .filter(|id| !verified.contains(id))
            .copied()
            .collect();

        Ok(OptInVerification {
            verified: Some(verified),
            invalid: (!invalid.is_empty()).then_some(invalid),
        })
    }

    /// Validates requested ids and rejects the whole request when any id is
    /// invalid, so no partial opt-in set is ever applied.
    pub async fn require_verified(
        &self,
        requested: Option<&[ChannelId]>,
    ) -> AppResult<Option<Vec<ChannelId>>> {
        let verification = self.verify(requested).await?;

        if let Some(invalid) = verification.invalid {
            let listed: Vec<String> = invalid.iter().map(ToString::to_string).collect();
            return Err(AppError::InvalidOptIns(listed.join(", ")));
        }

        Ok(verification.verified)
    }

    /// Lists all active channels for the subscription preferences UI.
    pub async fn list_active(&self) -> AppResult<Vec<OptInChannel>> {
        self.channels.list_active().await
    }
}
