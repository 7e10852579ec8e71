//! Collaborator ports consumed by the Linkletter flows.
//!
//! Infrastructure provides Postgres, SMTP, and HTTP implementations; tests
//! substitute recording doubles.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use linkletter_core::AppResult;
use linkletter_domain::{
    ChannelId, EmailAddress, OptInChannel, Subscriber, SubscriberId, SubscriberStatus,
};

/// Fields for creating a subscriber record.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    /// Unique email address.
    pub email: EmailAddress,
    /// Initial status; creation paths always use `pending`.
    pub status: SubscriberStatus,
    /// Opaque credential secret; an unknowable random value at creation.
    pub credential_secret: String,
    /// Keyed hash of an in-flight verification token, if one was minted.
    pub verification_token: Option<String>,
    /// Expiry of the in-flight token, if one was minted.
    pub verification_token_expires: Option<DateTime<Utc>>,
    /// Validated channel ids carried at creation, pending confirmation.
    pub opt_ins: Vec<ChannelId>,
    /// Optional first name captured at signup.
    pub first_name: Option<String>,
    /// Optional signup source attribution.
    pub source: Option<String>,
}

/// Repository port for subscriber persistence.
///
/// Operations are plain find/create/update calls; no atomicity is guaranteed
/// between a find and a subsequent write for the same subscriber.
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Finds a subscriber by (normalized) email address.
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Subscriber>>;

    /// Creates a subscriber record, returning the stored row.
    async fn create(&self, subscriber: NewSubscriber) -> AppResult<Subscriber>;

    /// Persists a freshly minted verification token hash and expiry,
    /// replacing any in-flight token.
    async fn store_verification_token(
        &self,
        id: SubscriberId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Rotates the opaque credential secret.
    async fn update_credential_secret(
        &self,
        id: SubscriberId,
        credential_secret: &str,
    ) -> AppResult<()>;

    /// Consumes a verification: rotates the credential secret, marks the
    /// subscriber `subscribed`, and clears both verification fields.
    async fn complete_verification(
        &self,
        id: SubscriberId,
        credential_secret: &str,
    ) -> AppResult<()>;

    /// Full-replace of the opt-in set for an authenticated, verified
    /// subscriber: sets opt-ins to exactly `opt_ins`, rotates the credential
    /// secret, marks the subscriber `subscribed`, and clears any stale
    /// verification fields. Returns the updated row.
    async fn replace_opt_ins(
        &self,
        id: SubscriberId,
        opt_ins: &[ChannelId],
        credential_secret: &str,
    ) -> AppResult<Subscriber>;

    /// Marks a subscriber `unsubscribed`. Idempotent.
    async fn mark_unsubscribed(&self, id: SubscriberId) -> AppResult<()>;
}

/// Repository port for opt-in channel lookups.
#[async_trait]
pub trait OptInChannelRepository: Send + Sync {
    /// Returns the active channels matching the requested ids. Ids that are
    /// unknown or inactive are simply absent from the result.
    async fn find_active_by_ids(&self, ids: &[ChannelId]) -> AppResult<Vec<OptInChannel>>;

    /// Lists all active channels.
    async fn list_active(&self) -> AppResult<Vec<OptInChannel>>;
}

/// Delivery receipt returned by the email collaborator.
///
/// Surfaced verbatim as `emailResult` in endpoint responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailReceipt {
    /// Recipient address.
    pub to: String,
    /// Message subject.
    pub subject: String,
    /// Transport-assigned message id, when available.
    pub message_id: Option<String>,
}

/// Port for sending emails. Infrastructure provides SMTP or console
/// implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends an email with a plain-text body and an optional HTML body.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<EmailReceipt>;
}

/// Response headers from a delegated host login, forwarded verbatim so the
/// host's session cookies reach the client.
pub type SessionHeaders = Vec<(String, String)>;

/// The authenticated subscriber resolved by the host's collection auth.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Email of the authenticated subscriber.
    pub email: EmailAddress,
    /// The subscriber document as the host returns it.
    pub subscriber: serde_json::Value,
    /// The host's permissions object for this session.
    pub permissions: serde_json::Value,
}

/// Port for the host framework's collection-auth HTTP endpoints.
#[async_trait]
pub trait HostAuthGateway: Send + Sync {
    /// Delegated login with email + credential secret. Returns the
    /// session-establishing response headers on success.
    async fn login(
        &self,
        email: &EmailAddress,
        credential_secret: &str,
    ) -> AppResult<SessionHeaders>;

    /// Resolves the authenticated subscriber, if any, from forwarded
    /// request cookies.
    async fn authenticate(&self, cookie: Option<&str>) -> AppResult<Option<AuthSession>>;

    /// Delegated logout, forwarding request cookies. Returns the host's
    /// confirmation message.
    async fn logout(&self, cookie: Option<&str>) -> AppResult<String>;
}
