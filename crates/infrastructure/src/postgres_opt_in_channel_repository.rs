//! PostgreSQL-backed opt-in channel repository.

use async_trait::async_trait;
use sqlx::PgPool;

use linkletter_application::OptInChannelRepository;
use linkletter_core::{AppError, AppResult};
use linkletter_domain::{ChannelId, OptInChannel};

/// PostgreSQL implementation of the opt-in channel repository port.
#[derive(Clone)]
pub struct PostgresOptInChannelRepository {
    pool: PgPool,
}

impl PostgresOptInChannelRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: uuid::Uuid,
    title: String,
    description: Option<String>,
    slug: Option<String>,
    active: bool,
}

impl From<ChannelRow> for OptInChannel {
    fn from(row: ChannelRow) -> Self {
        Self {
            id: ChannelId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            slug: row.slug,
            active: row.active,
        }
    }
}

#[async_trait]
impl OptInChannelRepository for PostgresOptInChannelRepository {
    async fn find_active_by_ids(&self, ids: &[ChannelId]) -> AppResult<Vec<OptInChannel>> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(ChannelId::as_uuid).collect();

        let rows = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, title, description, slug, active
            FROM opt_in_channels
            WHERE active AND id = ANY($1)
            "#,
        )
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find opt-in channels by ids: {error}"))
        })?;

        Ok(rows.into_iter().map(OptInChannel::from).collect())
    }

    async fn list_active(&self) -> AppResult<Vec<OptInChannel>> {
        let rows = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, title, description, slug, active
            FROM opt_in_channels
            WHERE active
            ORDER BY title
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list opt-in channels: {error}"))
        })?;

        Ok(rows.into_iter().map(OptInChannel::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use linkletter_application::OptInChannelRepository;
    use linkletter_domain::ChannelId;
    use sqlx::PgPool;
    use sqlx::migrate::Migrator;
    use sqlx::postgres::PgPoolOptions;

    use super::PostgresOptInChannelRepository;

    static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

    async fn test_pool() -> Option<PgPool> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            return None;
        };

        let pool = match PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url.as_str())
            .await
        {
            Ok(pool) => pool,
            Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
        };

        if let Err(error) = MIGRATOR.run(&pool).await {
            panic!("failed to run migrations for postgres channel tests: {error}");
        }

        Some(pool)
    }

    async fn insert_channel(pool: &PgPool, title: &str, active: bool) -> ChannelId {
        let id = ChannelId::new();
        let insert = sqlx::query(
            "INSERT INTO opt_in_channels (id, title, active) VALUES ($1, $2, $3)",
        )
        .bind(id.as_uuid())
        .bind(title)
        .bind(active)
        .execute(pool)
        .await;
        assert!(insert.is_ok());
        id
    }

    #[tokio::test]
    async fn inactive_channels_are_invisible_to_id_lookup() {
        let Some(pool) = test_pool().await else {
            return;
        };

        let repository = PostgresOptInChannelRepository::new(pool.clone());
        let active = insert_channel(&pool, "Active channel", true).await;
        let inactive = insert_channel(&pool, "Inactive channel", false).await;

        let found = repository.find_active_by_ids(&[active, inactive]).await;
        assert!(found.is_ok());
        let found = found.unwrap_or_default();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active);
    }
}
