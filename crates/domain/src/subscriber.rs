//! Subscriber domain types and validation rules.
//!
//! A subscriber is one end-user's subscription/auth identity. Records start
//! `pending` on first contact and become `subscribed` only through token
//! verification or an explicit authenticated opt-in save.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use linkletter_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::ChannelId;

/// Unique identifier for a subscriber record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    /// Creates a new random subscriber identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a subscriber identifier from an existing UUID value.
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

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least one
    /// `.`. Normalizes to lowercase.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::BadData);
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Subscription status of a subscriber record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Email ownership not yet verified.
    Pending,
    /// Verified and enrolled; reachable only through token verification or
    /// an authenticated opt-in save.
    Subscribed,
    /// Explicitly opted out via the unsubscribe flow.
    Unsubscribed,
}

impl SubscriberStatus {
    /// Returns the storage string for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Subscribed => "subscribed",
            Self::Unsubscribed => "unsubscribed",
        }
    }
}

impl FromStr for SubscriberStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "subscribed" => Ok(Self::Subscribed),
            "unsubscribed" => Ok(Self::Unsubscribed),
            _ => Err(AppError::Validation(format!(
                "unknown subscriber status '{value}'"
            ))),
        }
    }
}

/// Outcome of checking a presented token hash against a subscriber's stored
/// verification fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// Hash matches and the expiry has not passed.
    Valid,
    /// No verification in flight, or the presented hash does not match the
    /// stored one. Reported as `Token not verified`.
    Mismatch,
    /// Hash matches but the expiry timestamp has passed. Reported as
    /// `Token expired`.
    Expired,
}

/// One subscriber record as held in the subscriber store.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    /// Store-assigned identifier.
    pub id: SubscriberId,
    /// Unique, validated email address.
    pub email: EmailAddress,
    /// Subscription status.
    pub status: SubscriberStatus,
    /// Opaque credential secret used only for the delegated host login.
    /// Never transmitted to the user and never derived from user input.
    pub credential_secret: String,
    /// Keyed hash of the in-flight verification token, if any. Raw tokens
    /// are never persisted.
    pub verification_token: Option<String>,
    /// Expiry of the in-flight verification token, if any.
    pub verification_token_expires: Option<DateTime<Utc>>,
    /// Channels the subscriber is enrolled in.
    pub opt_ins: Vec<ChannelId>,
    /// Optional first name captured at signup.
    pub first_name: Option<String>,
    /// Optional signup source attribution (e.g. "Homepage form").
    pub source: Option<String>,
}

impl Subscriber {
    /// Checks a presented token hash against the stored verification fields.
    ///
    /// Equality is of keyed hashes, never of raw tokens. Expiry uses the
    /// strict inequality `now > expires_at`: a token expiring at exactly
    /// `now` is still valid.
    #[must_use]
    pub fn verification_state(
        &self,
        presented_hash: &str,
        now: DateTime<Utc>,
    ) -> VerificationState {
        let stored_hash = self
            .verification_token
            .as_deref()
            .filter(|hash| !hash.is_empty());

        let (Some(stored_hash), Some(expires_at)) =
            (stored_hash, self.verification_token_expires)
        else {
            return VerificationState::Mismatch;
        };

        if stored_hash != presented_hash {
            return VerificationState::Mismatch;
        }

        if now > expires_at {
            return VerificationState::Expired;
        }

        VerificationState::Valid
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn subscriber_with_token(hash: &str, expires_at: chrono::DateTime<Utc>) -> Subscriber {
        Subscriber {
            id: SubscriberId::new(),
            email: EmailAddress::new("a@x.com").unwrap_or_else(|_| panic!("test email")),
            status: SubscriberStatus::Pending,
            credential_secret: "opaque".to_owned(),
            verification_token: Some(hash.to_owned()),
            verification_token_expires: Some(expires_at),
            opt_ins: Vec::new(),
            first_name: None,
            source: None,
        }
    }

    #[test]
    fn valid_email_is_accepted_and_lowercased() {
        let email = EmailAddress::new("USER@Example.COM");
        assert!(email.is_ok());
        assert_eq!(
            email.unwrap_or_else(|_| panic!("test")).as_str(),
            "user@example.com"
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("user@nodot").is_err());
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(EmailAddress::new("  ").is_err());
    }

    #[test]
    fn status_round_trips_through_storage_strings() {
        for status in [
            SubscriberStatus::Pending,
            SubscriberStatus::Subscribed,
            SubscriberStatus::Unsubscribed,
        ] {
            assert_eq!(status.as_str().parse::<SubscriberStatus>().ok(), Some(status));
        }
    }

    #[test]
    fn matching_hash_before_expiry_is_valid() {
        let now = Utc::now();
        let subscriber = subscriber_with_token("hash-a", now + Duration::minutes(15));
        assert_eq!(
            subscriber.verification_state("hash-a", now),
            VerificationState::Valid
        );
    }

    #[test]
    fn mismatched_hash_is_not_verified_even_if_unexpired() {
        let now = Utc::now();
        let subscriber = subscriber_with_token("hash-a", now + Duration::minutes(15));
        assert_eq!(
            subscriber.verification_state("hash-b", now),
            VerificationState::Mismatch
        );
    }

    #[test]
    fn matching_hash_after_expiry_is_expired() {
        let now = Utc::now();
        let subscriber = subscriber_with_token("hash-a", now - Duration::seconds(1));
        assert_eq!(
            subscriber.verification_state("hash-a", now),
            VerificationState::Expired
        );
    }

    #[test]
    fn token_expiring_exactly_now_is_still_valid() {
        let now = Utc::now();
        let subscriber = subscriber_with_token("hash-a", now);
        assert_eq!(
            subscriber.verification_state("hash-a", now),
            VerificationState::Valid
        );
    }

    #[test]
    fn cleared_token_fields_are_not_verified() {
        let now = Utc::now();
        let mut subscriber = subscriber_with_token("hash-a", now + Duration::minutes(15));
        subscriber.verification_token = Some(String::new());
        assert_eq!(
            subscriber.verification_state("hash-a", now),
            VerificationState::Mismatch
        );

        subscriber.verification_token = None;
        subscriber.verification_token_expires = None;
        assert_eq!(
            subscriber.verification_state("hash-a", now),
            VerificationState::Mismatch
        );
    }
}
