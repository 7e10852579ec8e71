//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_email_service;
mod http_host_auth_gateway;
mod postgres_opt_in_channel_repository;
mod postgres_subscriber_repository;
mod smtp_email_service;

pub use console_email_service::ConsoleEmailService;
pub use http_host_auth_gateway::HttpHostAuthGateway;
pub use postgres_opt_in_channel_repository::PostgresOptInChannelRepository;
pub use postgres_subscriber_repository::PostgresSubscriberRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
