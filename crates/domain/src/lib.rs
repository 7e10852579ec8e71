//! Domain types for Linkletter subscribers and opt-in channels.

#![forbid(unsafe_code)]

/// Opt-in channel types.
pub mod channel;
/// Subscriber identity, status, and verification state.
pub mod subscriber;

pub use channel::{ChannelId, OptInChannel};
pub use subscriber::{
    EmailAddress, Subscriber, SubscriberId, SubscriberStatus, VerificationState,
};
