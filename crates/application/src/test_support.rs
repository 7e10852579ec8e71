//! Shared in-memory doubles for the service tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkletter_core::{AppError, AppResult};
use linkletter_domain::{
    ChannelId, EmailAddress, OptInChannel, Subscriber, SubscriberId, SubscriberStatus,
};

use crate::magic_link_service::{LinkConfig, MagicLinkService};
use crate::opt_in_service::OptInChannelService;
use crate::ports::{
    AuthSession, EmailReceipt, EmailService, HostAuthGateway, NewSubscriber,
    OptInChannelRepository, SessionHeaders, SubscriberRepository,
};
use crate::subscription_service::SubscriptionService;
use crate::token_codec::TokenCodec;

/// Parses a known-good email literal.
pub(crate) fn email(value: &str) -> EmailAddress {
    EmailAddress::new(value).unwrap_or_else(|error| panic!("bad test email {value}: {error}"))
}

/// Extracts the 64-hex-char `token=` query value from an emailed HTML body.
pub(crate) fn token_from_link(html: &str) -> String {
    let start = html
        .find("token=")
        .unwrap_or_else(|| panic!("no token in email body: {html}"))
        + "token=".len();
    html[start..start + 64].to_owned()
}

struct InMemorySubscribers {
    rows: Mutex<Vec<Subscriber>>,
}

impl InMemorySubscribers {
    fn with_row<T>(&self, id: SubscriberId, apply: impl FnOnce(&mut Subscriber) -> T) -> AppResult<T> {
        let mut rows = self
            .rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(AppError::BadData)?;
        Ok(apply(row))
    }
}

#[async_trait]
impl SubscriberRepository for InMemorySubscribers {
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Subscriber>> {
        let rows = self
            .rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(rows.iter().find(|row| &row.email == email).cloned())
    }

    async fn create(&self, subscriber: NewSubscriber) -> AppResult<Subscriber> {
        let row = Subscriber {
            id: SubscriberId::new(),
            email: subscriber.email,
            status: subscriber.status,
            credential_secret: subscriber.credential_secret,
            verification_token: subscriber.verification_token,
            verification_token_expires: subscriber.verification_token_expires,
            opt_ins: subscriber.opt_ins,
            first_name: subscriber.first_name,
            source: subscriber.source,
        };
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row.clone());
        Ok(row)
    }

    async fn store_verification_token(
        &self,
        id: SubscriberId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.with_row(id, |row| {
            row.verification_token = Some(token_hash.to_owned());
            row.verification_token_expires = Some(expires_at);
        })
    }

    async fn update_credential_secret(
        &self,
        id: SubscriberId,
        credential_secret: &str,
    ) -> AppResult<()> {
        self.with_row(id, |row| {
            row.credential_secret = credential_secret.to_owned();
        })
    }

    async fn complete_verification(
        &self,
        id: SubscriberId,
        credential_secret: &str,
    ) -> AppResult<()> {
        self.with_row(id, |row| {
            row.credential_secret = credential_secret.to_owned();
            row.status = SubscriberStatus::Subscribed;
            row.verification_token = None;
            row.verification_token_expires = None;
        })
    }

    async fn replace_opt_ins(
        &self,
        id: SubscriberId,
        opt_ins: &[ChannelId],
        credential_secret: &str,
    ) -> AppResult<Subscriber> {
        self.with_row(id, |row| {
            row.opt_ins = opt_ins.to_vec();
            row.credential_secret = credential_secret.to_owned();
            row.status = SubscriberStatus::Subscribed;
            row.verification_token = None;
            row.verification_token_expires = None;
            row.clone()
        })
    }

    async fn mark_unsubscribed(&self, id: SubscriberId) -> AppResult<()> {
        self.with_row(id, |row| {
            row.status = SubscriberStatus::Unsubscribed;
        })
    }
}

struct InMemoryChannels {
    active: Mutex<Vec<OptInChannel>>,
}

#[async_trait]
impl OptInChannelRepository for InMemoryChannels {
    async fn find_active_by_ids(&self, ids: &[ChannelId]) -> AppResult<Vec<OptInChannel>> {
        let active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(active
            .iter()
            .filter(|channel| ids.contains(&channel.id))
            .cloned()
            .collect())
    }

    async fn list_active(&self) -> AppResult<Vec<OptInChannel>> {
        let active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(active.clone())
    }
}

struct RecordingEmailService {
    sent: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
}

#[async_trait]
impl EmailService for RecordingEmailService {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<EmailReceipt> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("smtp connection refused".to_owned()));
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((
                to.to_owned(),
                subject.to_owned(),
                html_body.unwrap_or_default().to_owned(),
            ));
        Ok(EmailReceipt {
            to: to.to_owned(),
            subject: subject.to_owned(),
            message_id: Some("test-message-id".to_owned()),
        })
    }
}

struct RecordingAuthGateway {
    logins: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

#[async_trait]
impl HostAuthGateway for RecordingAuthGateway {
    async fn login(
        &self,
        email: &EmailAddress,
        credential_secret: &str,
    ) -> AppResult<SessionHeaders> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Internal("host login rejected".to_owned()));
        }
        self.logins
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((email.to_string(), credential_secret.to_owned()));
        Ok(vec![(
            "set-cookie".to_owned(),
            "payload-token=test-session; Path=/; HttpOnly".to_owned(),
        )])
    }

    async fn authenticate(&self, _cookie: Option<&str>) -> AppResult<Option<AuthSession>> {
        Ok(None)
    }

    async fn logout(&self, _cookie: Option<&str>) -> AppResult<String> {
        Ok("Logged out successfully.".to_owned())
    }
}

/// Wires the services over in-memory doubles and exposes their recorded
/// side effects.
pub(crate) struct TestHarness {
    subscribers: Arc<InMemorySubscribers>,
    channels: Arc<InMemoryChannels>,
    emails: Arc<RecordingEmailService>,
    auth: Arc<RecordingAuthGateway>,
    codec: TokenCodec,
    links: LinkConfig,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Arc::new(InMemorySubscribers {
                rows: Mutex::new(Vec::new()),
            }),
            channels: Arc::new(InMemoryChannels {
                active: Mutex::new(Vec::new()),
            }),
            emails: Arc::new(RecordingEmailService {
                sent: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            }),
            auth: Arc::new(RecordingAuthGateway {
                logins: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
            }),
            codec: TokenCodec::new("test-secret"),
            links: LinkConfig {
                verify_url: "https://h/verify".to_owned(),
                unsubscribe_url: Some("https://h/unsubscribe".to_owned()),
            },
        }
    }

    pub(crate) fn magic_link_service(&self) -> MagicLinkService {
        MagicLinkService::new(
            self.subscribers.clone(),
            OptInChannelService::new(self.channels.clone()),
            self.emails.clone(),
            self.auth.clone(),
            self.codec.clone(),
            self.links.clone(),
        )
    }

    pub(crate) fn subscription_service(&self) -> SubscriptionService {
        SubscriptionService::new(
            self.subscribers.clone(),
            OptInChannelService::new(self.channels.clone()),
            self.emails.clone(),
            self.codec.clone(),
            self.links.clone(),
        )
    }

    pub(crate) fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// HMAC signature over `content`, as unsubscribe links carry it.
    pub(crate) fn sign(&self, content: &str) -> String {
        self.codec
            .hmac_of(content)
            .unwrap_or_else(|error| panic!("signing failed: {error}"))
    }

    /// Registers an active channel and returns its id.
    pub(crate) fn add_channel(&self, title: &str) -> ChannelId {
        let id = ChannelId::new();
        self.channels
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(OptInChannel {
                id,
                title: title.to_owned(),
                description: None,
                slug: None,
                active: true,
            });
        id
    }

    /// Inserts a subscriber row directly, bypassing the flows.
    pub(crate) fn seed_subscriber(
        &self,
        address: &str,
        status: SubscriberStatus,
        opt_ins: Vec<ChannelId>,
    ) {
        let row = Subscriber {
            id: SubscriberId::new(),
            email: email(address),
            status,
            credential_secret: self
                .codec
                .mint_token(None)
                .map(|material| material.token_hash)
                .unwrap_or_else(|error| panic!("mint failed: {error}")),
            verification_token: None,
            verification_token_expires: None,
            opt_ins,
            first_name: None,
            source: None,
        };
        self.subscribers
            .rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(row);
    }

    pub(crate) fn find_subscriber(&self, address: &str) -> Option<Subscriber> {
        let wanted = email(address);
        self.subscribers
            .rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|row| row.email == wanted)
            .cloned()
    }

    pub(crate) fn subscriber(&self, address: &str) -> Subscriber {
        self.find_subscriber(address)
            .unwrap_or_else(|| panic!("no subscriber stored for {address}"))
    }

    /// Backdates the stored token expiry for a subscriber.
    pub(crate) fn expire_token(&self, address: &str, expires_at: DateTime<Utc>) {
        let wanted = email(address);
        let mut rows = self
            .subscribers
            .rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let row = rows
            .iter_mut()
            .find(|row| row.email == wanted)
            .unwrap_or_else(|| panic!("no subscriber stored for {address}"));
        row.verification_token_expires = Some(expires_at);
    }

    pub(crate) fn sent_email_count(&self) -> usize {
        self.emails
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// HTML body of the most recent email.
    pub(crate) fn last_email_html(&self) -> String {
        self.emails
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .map(|(_, _, html)| html.clone())
            .unwrap_or_else(|| panic!("no email was sent"))
    }

    /// `(email, credential_secret)` of the most recent delegated login.
    pub(crate) fn last_login(&self) -> (String, String) {
        self.auth
            .logins
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
            .unwrap_or_else(|| panic!("no login was recorded"))
    }

    pub(crate) fn fail_email_sends(&self) {
        self.emails.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_logins(&self) {
        self.auth.fail.store(true, Ordering::SeqCst);
    }
}
