//! Subscribe and unsubscribe flows.
//!
//! The subscribe flow is a four-scenario state machine computed once from
//! `(subscriber found, status, caller authenticated)` and dispatched with an
//! exhaustive match, so a missing branch is a compile error rather than a
//! runtime `Unknown error`.

use std::sync::Arc;

use chrono::Duration;
use linkletter_core::{AppError, AppResult};
use linkletter_domain::{ChannelId, EmailAddress, Subscriber, SubscriberStatus};
use tracing::{info, warn};

use crate::emails::{self, VerifyLink};
use crate::magic_link_service::{LinkConfig, VERIFICATION_TOKEN_TTL_MINUTES};
use crate::opt_in_service::OptInChannelService;
use crate::ports::{EmailReceipt, EmailService, NewSubscriber, SubscriberRepository};
use crate::token_codec::TokenCodec;

/// Input for the subscribe flow.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    /// Target subscriber email.
    pub email: EmailAddress,
    /// Requested channel ids; `None` leaves existing opt-ins untouched.
    pub opt_ins: Option<Vec<ChannelId>>,
    /// Per-request verify URL override for the verification email.
    pub verify_url: Option<String>,
    /// Optional subject override.
    pub subject: Option<String>,
    /// Optional HTML message override.
    pub message: Option<String>,
    /// Optional first name captured at signup.
    pub first_name: Option<String>,
    /// Optional signup source attribution.
    pub source: Option<String>,
    /// Email of the authenticated caller, if any.
    pub authenticated_email: Option<EmailAddress>,
}

/// The four mutually exclusive subscribe scenarios.
#[derive(Debug, Clone)]
pub enum SubscribeScenario {
    /// No subscriber record exists yet.
    NewSubscriber,
    /// A record exists but the caller is not authenticated.
    UnauthenticatedExisting(Subscriber),
    /// The caller is authenticated but the record is still `pending`:
    /// email ownership must be verified before opt-in writes take effect.
    AuthenticatedPending(Subscriber),
    /// The caller is authenticated and the record is `subscribed` or
    /// `unsubscribed`: opt-ins are applied directly.
    AuthenticatedVerified(Subscriber),
}

impl SubscribeScenario {
    /// Computes the scenario once from the lookup result and caller
    /// authentication.
    #[must_use]
    pub fn classify(subscriber: Option<Subscriber>, authenticated: bool) -> Self {
        match (subscriber, authenticated) {
            (None, _) => Self::NewSubscriber,
            (Some(subscriber), false) => Self::UnauthenticatedExisting(subscriber),
            (Some(subscriber), true) if subscriber.status == SubscriberStatus::Pending => {
                Self::AuthenticatedPending(subscriber)
            }
            (Some(subscriber), true) => Self::AuthenticatedVerified(subscriber),
        }
    }
}

/// Result of the subscribe flow.
#[derive(Debug, Clone)]
pub enum SubscribeOutcome {
    /// A verification email was sent; opt-ins take effect after the verify
    /// step.
    VerificationEmailSent(EmailReceipt),
    /// Opt-ins were applied directly for an authenticated, verified
    /// subscriber.
    OptInsUpdated {
        /// Subscriber email.
        email: EmailAddress,
        /// The full replacement opt-in set now in effect.
        opt_ins: Vec<ChannelId>,
    },
}

/// Application service for the subscribe and unsubscribe flows.
#[derive(Clone)]
pub struct SubscriptionService {
    subscribers: Arc<dyn SubscriberRepository>,
    opt_in_channels: OptInChannelService,
    email_service: Arc<dyn EmailService>,
    codec: TokenCodec,
    links: LinkConfig,
}

impl SubscriptionService {
    /// Creates a new subscription service.
    #[must_use]
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        opt_in_channels: OptInChannelService,
        email_service: Arc<dyn EmailService>,
        codec: TokenCodec,
        links: LinkConfig,
    ) -> Self {
        Self {
            subscribers,
            opt_in_channels,
            email_service,
            codec,
            links,
        }
    }

    /// Runs the subscribe flow.
    ///
    /// Opt-ins are validated before any branch; a single invalid id rejects
    /// the whole request. An authenticated caller may only act on their own
    /// email.
    pub async fn subscribe(&self, request: SubscribeRequest) -> AppResult<SubscribeOutcome> {
        let verified_opt_ins = self
            .opt_in_channels
            .require_verified(request.opt_ins.as_deref())
            .await?;

        if let Some(authenticated) = &request.authenticated_email {
            if authenticated != &request.email {
                return Err(AppError::Unauthorized(request.email.to_string()));
            }
        }

        let subscriber = self.subscribers.find_by_email(&request.email).await?;
        let scenario =
            SubscribeScenario::classify(subscriber, request.authenticated_email.is_some());

        match scenario {
            SubscribeScenario::NewSubscriber => {
                let created = self.create_pending(&request, &verified_opt_ins).await?;
                let receipt = self
                    .send_verification_email(
                        &created,
                        &request,
                        verified_opt_ins.as_deref(),
                        "<h1>Click here to verify your subscription:</h1>",
                    )
                    .await?;
                Ok(SubscribeOutcome::VerificationEmailSent(receipt))
            }
            SubscribeScenario::UnauthenticatedExisting(existing) => {
                // A login-style re-request: opt-ins are NOT applied here;
                // they ride along in the link for after verification.
                let receipt = self
                    .send_verification_email(
                        &existing,
                        &request,
                        verified_opt_ins.as_deref(),
                        "<h1>Click here to verify your subscription:</h1>",
                    )
                    .await?;
                Ok(SubscribeOutcome::VerificationEmailSent(receipt))
            }
            SubscribeScenario::AuthenticatedPending(existing) => {
                let receipt = self
                    .send_verification_email(
                        &existing,
                        &request,
                        verified_opt_ins.as_deref(),
                        "<h1>Click here to verify your email:</h1>",
                    )
                    .await?;
                Ok(SubscribeOutcome::VerificationEmailSent(receipt))
            }
            SubscribeScenario::AuthenticatedVerified(existing) => {
                // Full replace: omitted channels are implicitly
                // unsubscribed. Absent input leaves the set untouched.
                let opt_ins = verified_opt_ins.unwrap_or_else(|| existing.opt_ins.clone());
                let unknowable = self.codec.mint_token(None)?.token_hash;
                let updated = self
                    .subscribers
                    .replace_opt_ins(existing.id, &opt_ins, &unknowable)
                    .await?;

                info!(email = %updated.email, opt_ins = updated.opt_ins.len(), "opt-ins updated");
                Ok(SubscribeOutcome::OptInsUpdated {
                    email: updated.email,
                    opt_ins: updated.opt_ins,
                })
            }
        }
    }

    /// Validates an HMAC-signed unsubscribe token and flips the subscriber
    /// to `unsubscribed`. Idempotent: repeated calls succeed.
    pub async fn unsubscribe(
        &self,
        email: &EmailAddress,
        unsubscribe_token: &str,
        authenticated_email: Option<&EmailAddress>,
    ) -> AppResult<()> {
        let signature = self.codec.hmac_of(email.as_str())?;
        if unsubscribe_token != signature {
            return Err(AppError::BadData);
        }

        let subscriber = self
            .subscribers
            .find_by_email(email)
            .await?
            .ok_or(AppError::BadData)?;

        if let Some(authenticated) = authenticated_email {
            if authenticated != &subscriber.email {
                return Err(AppError::Unauthorized(subscriber.email.to_string()));
            }
        }

        self.subscribers.mark_unsubscribed(subscriber.id).await?;

        info!(email = %email, "subscriber unsubscribed");
        Ok(())
    }

    async fn create_pending(
        &self,
        request: &SubscribeRequest,
        verified_opt_ins: &Option<Vec<ChannelId>>,
    ) -> AppResult<Subscriber> {
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

    /// Mints a fresh verification token for `subscriber` and sends the
    /// verification email carrying it.
    async fn send_verification_email(
        &self,
        subscriber: &Subscriber,
        request: &SubscribeRequest,
        verified_opt_ins: Option<&[ChannelId]>,
        default_message: &str,
    ) -> AppResult<EmailReceipt> {
        let ttl = Duration::minutes(VERIFICATION_TOKEN_TTL_MINUTES);
        let material = self.codec.mint_token(Some(ttl))?;
        let expires_at = material
            .expires_at
            .ok_or_else(|| AppError::Internal("minted token is missing an expiry".to_owned()))?;

        self.subscribers
            .store_verification_token(subscriber.id, &material.token_hash, expires_at)
            .await?;

        let base_url = request.verify_url.as_deref().unwrap_or(&self.links.verify_url);
        let verify_link = emails::build_verify_link(&VerifyLink {
            base_url,
            token: &material.token,
            email: &request.email,
            forward_url: None,
            opt_ins: verified_opt_ins,
        })?;

        let unsubscribe_link = match self.links.unsubscribe_url.as_deref() {
            Some(unsubscribe_base) => {
                let signature = self.codec.hmac_of(request.email.as_str())?;
                Some(emails::build_unsubscribe_link(
                    unsubscribe_base,
                    &request.email,
                    &signature,
                )?)
            }
            None => None,
        };

        let subject = request
            .subject
            .as_deref()
            .unwrap_or("Please verify your subscription");
        let message = request.message.as_deref().unwrap_or(default_message);
        let html_body =
            emails::render_html_body(message, &verify_link, "Verify", unsubscribe_link.as_deref());
        let text_body = emails::render_text_body("Verify your subscription:", &verify_link);

        let receipt = match self
            .email_service
            .send_email(request.email.as_str(), subject, &text_body, Some(&html_body))
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(email = %request.email, %error, "verification email send failed");
                return Err(AppError::EmailFailed);
            }
        };

        info!(email = %request.email, link = %verify_link, "verification email sent");
        Ok(receipt)
    }
}
