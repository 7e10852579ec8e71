//! PostgreSQL-backed subscriber repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use linkletter_application::{NewSubscriber, SubscriberRepository};
use linkletter_core::{AppError, AppResult};
use linkletter_domain::{ChannelId, EmailAddress, Subscriber, SubscriberId, SubscriberStatus};

/// PostgreSQL implementation of the subscriber repository port.
#[derive(Clone)]
pub struct PostgresSubscriberRepository {
    pool: PgPool,
}

impl PostgresSubscriberRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SUBSCRIBER_SELECT: &str = r#"
    SELECT s.id, s.email, s.status, s.credential_secret, s.verification_token,
           s.verification_token_expires, s.first_name, s.source,
           COALESCE(
               ARRAY_AGG(o.channel_id) FILTER (WHERE o.channel_id IS NOT NULL),
               '{}'
           ) AS opt_ins
    FROM subscribers s
    LEFT JOIN subscriber_opt_ins o ON o.subscriber_id = s.id
"#;

#[derive(Debug, sqlx::FromRow)]
struct SubscriberRow {
    id: uuid::Uuid,
    email: String,
    status: String,
    credential_secret: String,
    verification_token: Option<String>,
    verification_token_expires: Option<DateTime<Utc>>,
    first_name: Option<String>,
    source: Option<String>,
    opt_ins: Vec<uuid::Uuid>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = AppError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SubscriberId::from_uuid(row.id),
            email: EmailAddress::new(row.email)?,
            status: SubscriberStatus::from_str(&row.status)?,
            credential_secret: row.credential_secret,
            verification_token: row.verification_token,
            verification_token_expires: row.verification_token_expires,
            opt_ins: row.opt_ins.into_iter().map(ChannelId::from_uuid).collect(),
            first_name: row.first_name,
            source: row.source,
        })
    }
}

impl PostgresSubscriberRepository {
    async fn find_by_id(&self, id: SubscriberId) -> AppResult<Option<Subscriber>> {
        let query = format!("{SUBSCRIBER_SELECT} WHERE s.id = $1 GROUP BY s.id");
        let row = sqlx::query_as::<_, SubscriberRow>(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to find subscriber by id: {error}"))
            })?;

        row.map(Subscriber::try_from).transpose()
    }
}

#[async_trait]
impl SubscriberRepository for PostgresSubscriberRepository {
    async fn find_by_email(&self, email: &EmailAddress) -> AppResult<Option<Subscriber>> {
        let query = format!("{SUBSCRIBER_SELECT} WHERE s.email = $1 GROUP BY s.id");
        let row = sqlx::query_as::<_, SubscriberRow>(&query)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to find subscriber by email: {error}"))
            })?;

        row.map(Subscriber::try_from).transpose()
    }

    async fn create(&self, subscriber: NewSubscriber) -> AppResult<Subscriber> {
        let id = SubscriberId::new();

        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin create transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO subscribers (
                id, email, status, credential_secret,
                verification_token, verification_token_expires,
                first_name, source
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id.as_uuid())
        .bind(subscriber.email.as_str())
        .bind(subscriber.status.as_str())
        .bind(&subscriber.credential_secret)
        .bind(&subscriber.verification_token)
        .bind(subscriber.verification_token_expires)
        .bind(&subscriber.first_name)
        .bind(&subscriber.source)
        .execute(&mut *transaction)
        .await
        .map_err(|error| duplicate_email_or_internal(error, "create subscriber"))?;

        for channel_id in &subscriber.opt_ins {
            sqlx::query(
                "INSERT INTO subscriber_opt_ins (subscriber_id, channel_id) VALUES ($1, $2)",
            )
            .bind(id.as_uuid())
            .bind(channel_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to store subscriber opt-ins: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit subscriber create: {error}"))
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("created subscriber row is missing".to_owned()))
    }

    async fn store_verification_token(
        &self,
        id: SubscriberId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET verification_token = $2,
                verification_token_expires = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to store verification token: {error}"))
        })?;

        require_row(result.rows_affected())
    }

    async fn update_credential_secret(
        &self,
        id: SubscriberId,
        credential_secret: &str,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET credential_secret = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(credential_secret)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to update credential secret: {error}"))
        })?;

        require_row(result.rows_affected())
    }

    async fn complete_verification(
        &self,
        id: SubscriberId,
        credential_secret: &str,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET credential_secret = $2,
                status = $3,
                verification_token = NULL,
                verification_token_expires = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(credential_secret)
        .bind(SubscriberStatus::Subscribed.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to complete verification: {error}"))
        })?;

        require_row(result.rows_affected())
    }

    async fn replace_opt_ins(
        &self,
        id: SubscriberId,
        opt_ins: &[ChannelId],
        credential_secret: &str,
    ) -> AppResult<Subscriber> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin opt-in transaction: {error}"))
        })?;

        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET credential_secret = $2,
                status = $3,
                verification_token = NULL,
                verification_token_expires = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(credential_secret)
        .bind(SubscriberStatus::Subscribed.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update subscriber: {error}")))?;
        require_row(result.rows_affected())?;

        sqlx::query("DELETE FROM subscriber_opt_ins WHERE subscriber_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear subscriber opt-ins: {error}"))
            })?;

        for channel_id in opt_ins {
            sqlx::query(
                "INSERT INTO subscriber_opt_ins (subscriber_id, channel_id) VALUES ($1, $2)",
            )
            .bind(id.as_uuid())
            .bind(channel_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to store subscriber opt-ins: {error}"))
            })?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit opt-in replace: {error}"))
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("updated subscriber row is missing".to_owned()))
    }

    async fn mark_unsubscribed(&self, id: SubscriberId) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET status = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(SubscriberStatus::Unsubscribed.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to mark subscriber unsubscribed: {error}"))
        })?;

        require_row(result.rows_affected())
    }
}

fn require_row(rows_affected: u64) -> AppResult<()> {
    if rows_affected == 0 {
        return Err(AppError::BadData);
    }
    Ok(())
}

fn duplicate_email_or_internal(error: sqlx::Error, operation: &str) -> AppError {
    if let sqlx::Error::Database(ref database_error) = error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::BadData;
    }

    AppError::Internal(format!("failed to {operation}: {error}"))
}
