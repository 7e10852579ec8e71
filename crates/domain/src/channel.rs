//! Opt-in channel domain types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an opt-in channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(Uuid);

impl ChannelId {
    /// Creates a new random channel identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a channel identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named subscription topic a subscriber can be enrolled in.
///
/// Channels have an independent lifecycle managed in the host admin; the
/// `active` flag gates whether a channel is offered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptInChannel {
    /// Store-assigned identifier.
    pub id: ChannelId,
    /// Unique display title.
    pub title: String,
    /// Optional description shown in subscription preferences.
    pub description: Option<String>,
    /// URL-friendly slug.
    pub slug: Option<String>,
    /// Whether the channel is currently offered.
    pub active: bool,
}
