//! Application services and collaborator ports for Linkletter.
//!
//! Flows are request-scoped and stateless: every collaborator (subscriber
//! store, opt-in channel store, email sender, host auth) is an injected
//! `Arc<dyn …>` port so tests can substitute doubles. No atomicity is
//! guaranteed between a find and the subsequent update/create for the same
//! subscriber; the short token TTL bounds the consequences.

#![forbid(unsafe_code)]

/// Verification email composition helpers.
mod emails;
/// Magic-link request and verify flows.
pub mod magic_link_service;
/// Opt-in channel validation and listing.
pub mod opt_in_service;
/// Collaborator ports and their supporting types.
pub mod ports;
/// Subscribe and unsubscribe flows.
pub mod subscription_service;
#[cfg(test)]
mod test_support;
/// Token minting, keyed hashing, and HMAC signatures.
pub mod token_codec;

pub use magic_link_service::{LinkConfig, MagicLinkRequest, MagicLinkService};
pub use opt_in_service::{OptInChannelService, OptInVerification};
pub use ports::{
    AuthSession, EmailReceipt, EmailService, HostAuthGateway, NewSubscriber, OptInChannelRepository,
    SessionHeaders, SubscriberRepository,
};
pub use subscription_service::{
    SubscribeOutcome, SubscribeRequest, SubscribeScenario, SubscriptionService,
};
pub use token_codec::{TokenCodec, TokenMaterial};
