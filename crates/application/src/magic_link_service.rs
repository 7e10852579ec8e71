//! Magic-link request and verify flows.
//!
//! Requesting a link mints a single-use, time-limited token, persists only
//! its keyed hash, and emails the raw token inside a verify link. Verifying
//! compares hashes, enforces expiry, establishes a session through the
//! host's collection auth, and consumes the token.
//!
//! Verification is check-then-clear: a token could be used twice inside the
//! race window between two concurrent verify calls. The short TTL bounds
//! the exposure.

use std::sync::Arc;

use chrono::{Duration, Utc};
use linkletter_core::{AppError, AppResult};
use linkletter_domain::{ChannelId, EmailAddress, Subscriber, SubscriberStatus, VerificationState};
use tracing::{info, warn};

use crate::emails::{self, VerifyLink};
use crate::opt_in_service::OptInChannelService;
use crate::ports::{
    EmailReceipt, EmailService, HostAuthGateway, NewSubscriber, SessionHeaders,
    SubscriberRepository,
};
use crate::token_codec::TokenCodec;

/// Fixed lifetime of a verification token.
pub(crate) const VERIFICATION_TOKEN_TTL_MINUTES: i64 = 15;

/// Link configuration shared by the email-sending flows.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Default verify-page URL embedded in emailed links.
    pub verify_url: String,
    /// Unsubscribe-page base URL; when absent, emails carry no unsubscribe
    /// footer.
    pub unsubscribe_url: Option<String>,
}

/// Input for the magic-link request flow.
#[derive(Debug, Clone)]
pub struct MagicLinkRequest {
    /// Target subscriber email.
    pub email: EmailAddress,
    /// Per-request verify URL override.
    pub verify_url: Option<String>,
    /// Optional post-verification redirect carried through the link.
    pub forward_url: Option<String>,
    /// Optional subject override.
    pub subject: Option<String>,
    /// Optional HTML message override.
    pub message: Option<String>,
    /// Channel ids carried at first contact; validated before any write.
    pub opt_ins: Option<Vec<ChannelId>>,
    /// Optional first name captured at signup.
    pub first_name: Option<String>,
    /// Optional signup source attribution.
    pub source: Option<String>,
}

/// Application service for the magic-link request and verify flows.
#[derive(Clone)]
pub struct MagicLinkService {
    subscribers: Arc<dyn SubscriberRepository>,
    opt_in_channels: OptInChannelService,
    email_service: Arc<dyn EmailService>,
    auth_gateway: Arc<dyn HostAuthGateway>,
    codec: TokenCodec,
    links: LinkConfig,
}

impl MagicLinkService {
    /// Creates a new magic-link service.
    #[must_use]
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        opt_in_channels: OptInChannelService,
        email_service: Arc<dyn EmailService>,
        auth_gateway: Arc<dyn HostAuthGateway>,
        codec: TokenCodec,
        links: LinkConfig,
    ) -> Self {
        Self {
            subscribers,
            opt_in_channels,
            email_service,
            auth_gateway,
            codec,
            links,
        }
    }

    /// Issues a magic-link token and sends the login email.
    ///
    /// Finds or creates the subscriber (created `pending` with an unknowable
    /// credential secret), replaces any in-flight token, and emails a link
    /// carrying the raw token. Repeated calls rotate the token; each call
    /// sends a new email.
    pub async fn request_magic_link(&self, request: MagicLinkRequest) -> AppResult<EmailReceipt> {
        let verified_opt_ins = self
            .opt_in_channels
            .require_verified(request.opt_ins.as_deref())
            .await?;

        let subscriber = self.find_or_create_pending(&request, &verified_opt_ins).await?;

        let ttl = Duration::minutes(VERIFICATION_TOKEN_TTL_MINUTES);
        let material = self.codec.mint_token(Some(ttl))?;
        let expires_at = material
            .expires_at
            .ok_or_else(|| AppError::Internal("minted token is missing an expiry".to_owned()))?;

        self.subscribers
            .store_verification_token(subscriber.id, &material.token_hash, expires_at)
            .await?;

        let base_url = request.verify_url.as_deref().unwrap_or(&self.links.verify_url);
        let login_link = emails::build_verify_link(&VerifyLink {
            base_url,
            token: &material.token,
            email: &request.email,
            forward_url: request.forward_url.as_deref(),
            opt_ins: verified_opt_ins.as_deref(),
        })?;

        let unsubscribe_link = self.unsubscribe_link_for(&request.email)?;

        let subject = request
            .subject
            .as_deref()
            .unwrap_or("Your Magic Login Link");
        let message = request
            .message
            .as_deref()
            .unwrap_or("<p>Use this link to log in:</p>");
        let html_body = emails::render_html_body(
            message,
            &login_link,
            "Login",
            unsubscribe_link.as_deref(),
        );
        let text_body = emails::render_text_body("Use this link to log in:", &login_link);

        let receipt = match self
            .email_service
            .send_email(request.email.as_str(), subject, &text_body, Some(&html_body))
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(email = %request.email, %error, "magic link email send failed");
                return Err(AppError::EmailFailed);
            }
        };

        info!(email = %request.email, link = %login_link, "magic link email sent");
        Ok(receipt)
    }

    /// Validates a presented token and establishes a session.
    ///
    /// On success the credential secret briefly becomes the *hash* of the
    /// verified token (never the raw token) for the delegated login, then is
    /// rotated to a fresh unknowable value while the token fields are
    /// cleared and the subscriber becomes `subscribed`.
    pub async fn verify_magic_link(
        &self,
        email: &EmailAddress,
        token: &str,
    ) -> AppResult<SessionHeaders> {
        let subscriber = self
            .subscribers
            .find_by_email(email)
            .await?
            .ok_or(AppError::BadData)?;

        let token_hash = self.codec.hash_of(token);

        match subscriber.verification_state(&token_hash, Utc::now()) {
            VerificationState::Mismatch => return Err(AppError::TokenNotVerified),
            VerificationState::Expired => return Err(AppError::TokenExpired),
            VerificationState::Valid => {}
        }

        self.subscribers
            .update_credential_secret(subscriber.id, &token_hash)
            .await?;

        let headers = self
            .auth_gateway
            .login(email, &token_hash)
            .await
            .map_err(|error| AppError::LoginFailed(error.to_string()))?;

        let unknowable = self.codec.mint_token(None)?.token_hash;
        self.subscribers
            .complete_verification(subscriber.id, &unknowable)
            .await?;

        info!(email = %email, "magic link verified");
        Ok(headers)
    }

    /// Builds the HMAC-signed unsubscribe link, when configured.
    pub(crate) fn unsubscribe_link_for(&self, email: &EmailAddress) -> AppResult<Option<String>> {
        let Some(base_url) = self.links.unsubscribe_url.as_deref() else {
            return Ok(None);
        };

        let signature = self.codec.hmac_of(email.as_str())?;
        emails::build_unsubscribe_link(base_url, email, &signature).map(Some)
    }

    async fn find_or_create_pending(
        &self,
        request: &MagicLinkRequest,
        verified_opt_ins: &Option<Vec<ChannelId>>,
    ) -> AppResult<Subscriber> {
        if let Some(existing) = self.subscribers.find_by_email(&request.email).await? {
            return Ok(existing);
        }

        // The credential secret is an unknowable random value so the record
        // cannot be authenticated by guessing a password.
        let unknowable = self.codec.mint_token(None)?.token_hash;

        self.subscribers
            .create(NewSubscriber {
                email: request.email.clone(),
                status: SubscriberStatus::Pending,
                credential_secret: unknowable,
                verification_token: None,
                verification_token_expires: None,
                opt_ins: verified_opt_ins.clone().unwrap_or_default(),
                first_name: request.first_name.clone(),
                source: request.source.clone(),
            })
            .await
    }
}
