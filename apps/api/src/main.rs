//! Linkletter API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod dto;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use linkletter_application::{
    EmailService, HostAuthGateway, LinkConfig, MagicLinkService, OptInChannelService,
    SubscriptionService, TokenCodec,
};
use linkletter_core::AppError;
use linkletter_infrastructure::{
    ConsoleEmailService, HttpHostAuthGateway, PostgresOptInChannelRepository,
    PostgresSubscriberRepository, SmtpEmailConfig, SmtpEmailService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api_config::{ApiConfig, EmailProviderConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let subscriber_repository = Arc::new(PostgresSubscriberRepository::new(pool.clone()));
    let channel_repository = Arc::new(PostgresOptInChannelRepository::new(pool));
    let opt_in_channel_service = OptInChannelService::new(channel_repository);

    let email_service: Arc<dyn EmailService> = match &config.email_provider {
        EmailProviderConfig::Console => Arc::new(ConsoleEmailService::new()),
        EmailProviderConfig::Smtp(smtp) => Arc::new(SmtpEmailService::new(SmtpEmailConfig {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from_address: smtp.from_address.clone(),
        })),
    };

    let auth_gateway: Arc<dyn HostAuthGateway> = Arc::new(HttpHostAuthGateway::new(
        reqwest::Client::new(),
        config.server_url.clone(),
    ));

    let codec = TokenCodec::new(config.subscribers_secret.clone());
    let links = LinkConfig {
        verify_url: config.verify_url.clone(),
        unsubscribe_url: config.unsubscribe_url.clone(),
    };

    let app_state = AppState {
        magic_link_service: MagicLinkService::new(
            subscriber_repository.clone(),
            opt_in_channel_service.clone(),
            email_service.clone(),
            auth_gateway.clone(),
            codec.clone(),
            links.clone(),
        ),
        subscription_service: SubscriptionService::new(
            subscriber_repository,
            opt_in_channel_service.clone(),
            email_service,
            codec,
            links,
        ),
        opt_in_channel_service,
        auth_gateway,
    };

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route(
            "/emailToken",
            post(handlers::magic_link::email_token_handler),
        )
        .route(
            "/verifyToken",
            post(handlers::magic_link::verify_token_handler),
        )
        .route("/subscribe", post(handlers::subscribe::subscribe_handler))
        .route(
            "/unsubscribe",
            post(handlers::subscribe::unsubscribe_handler),
        )
        .route(
            "/subscriberAuth",
            post(handlers::auth::subscriber_auth_handler),
        )
        .route("/logout", post(handlers::auth::logout_handler))
        .route(
            "/optinchannels",
            get(handlers::channels::opt_in_channels_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "linkletter-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
