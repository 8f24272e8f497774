use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::error::SchemaError;
use crate::domain::repository::SchemaCatalog;

/// SchemaCatalogPostgres は information_schema を現在のスキーマに限定して参照する。
pub struct SchemaCatalogPostgres {
    pool: PgPool,
}

impl SchemaCatalogPostgres {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaCatalog for SchemaCatalogPostgres {
    async fn table_exists(&self, table_name: &str) -> Result<bool, SchemaError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn column_exists(
        &self,
        table_name: &str,
        column_name: &str,
    ) -> Result<bool, SchemaError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2)",
        )
        .bind(table_name)
        .bind(column_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_columns(&self, table_name: &str) -> Result<Vec<String>, SchemaError> {
        let columns = sqlx::query_scalar::<_, String>(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    async fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }
}
