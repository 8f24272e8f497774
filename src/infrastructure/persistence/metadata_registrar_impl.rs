//! `_System_Table` / `_System_Object` / `_System_Field` への読み書き。
//!
//! 書き込み関数はプール・トランザクションのどちらからでも呼べる。1文で済むものは
//! `PgExecutor`、チャンクごとに複数文を発行するものは `Acquire` を受け取る。

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Acquire, PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};

use crate::domain::entity::table_registry::CREATED_BY_BOOTSTRAP;
use crate::domain::entity::{FieldMetadata, ObjectMetadata, TableDefinition, TableRegistryItem};
use crate::domain::error::SchemaError;
use crate::domain::repository::MetadataRegistrar;
use crate::domain::service::id_generator;
use crate::infrastructure::config::SchemaEngineConfig;
use crate::infrastructure::persistence::transaction_manager::TransactionManager;

const OBJECT_COLUMNS: &str = "INSERT INTO \"_System_Object\" \
    (id, api_name, label, plural_label, icon, description, is_custom, sharing_model, \
     app_id, path_field, list_fields, theme_color, table_type, created_date, last_modified_date) ";

const OBJECT_CONFLICT: &str = " ON CONFLICT (api_name) DO UPDATE SET \
    label = EXCLUDED.label, \
    plural_label = EXCLUDED.plural_label, \
    icon = EXCLUDED.icon, \
    description = EXCLUDED.description, \
    is_custom = EXCLUDED.is_custom, \
    sharing_model = EXCLUDED.sharing_model, \
    app_id = EXCLUDED.app_id, \
    path_field = EXCLUDED.path_field, \
    list_fields = EXCLUDED.list_fields, \
    theme_color = EXCLUDED.theme_color, \
    table_type = EXCLUDED.table_type, \
    last_modified_date = CURRENT_TIMESTAMP";

const FIELD_COLUMNS: &str = "INSERT INTO \"_System_Field\" \
    (id, object_id, api_name, label, field_type, required, is_unique, is_system, is_name_field, \
     default_value, help_text, options, min_length, max_length, reference_to, is_polymorphic, \
     is_master_detail, delete_rule, relationship_name, formula, return_type, rollup_config, \
     created_date, last_modified_date) ";

const FIELD_CONFLICT: &str = " ON CONFLICT (object_id, api_name) DO UPDATE SET \
    label = EXCLUDED.label, \
    field_type = EXCLUDED.field_type, \
    required = EXCLUDED.required, \
    is_unique = EXCLUDED.is_unique, \
    is_system = EXCLUDED.is_system, \
    is_name_field = EXCLUDED.is_name_field, \
    default_value = EXCLUDED.default_value, \
    help_text = EXCLUDED.help_text, \
    options = EXCLUDED.options, \
    min_length = EXCLUDED.min_length, \
    max_length = EXCLUDED.max_length, \
    reference_to = EXCLUDED.reference_to, \
    is_polymorphic = EXCLUDED.is_polymorphic, \
    is_master_detail = EXCLUDED.is_master_detail, \
    delete_rule = EXCLUDED.delete_rule, \
    relationship_name = EXCLUDED.relationship_name, \
    formula = EXCLUDED.formula, \
    return_type = EXCLUDED.return_type, \
    rollup_config = EXCLUDED.rollup_config, \
    last_modified_date = CURRENT_TIMESTAMP";

const TABLE_COLUMNS: &str = "INSERT INTO \"_System_Table\" \
    (id, table_name, table_type, category, description, is_managed, schema_version, \
     created_by, created_date, last_modified_date) ";

const TABLE_CONFLICT: &str =
    " ON CONFLICT (table_name) DO UPDATE SET last_modified_date = CURRENT_TIMESTAMP";

fn object_insert(objects: &[ObjectMetadata], upsert: bool) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(OBJECT_COLUMNS);
    qb.push_values(objects, |mut b, o| {
        b.push_bind(o.resolved_id())
            .push_bind(o.api_name.clone())
            .push_bind(o.label.clone())
            .push_bind(o.plural_label.clone())
            .push_bind(o.icon.clone())
            .push_bind(o.description.clone())
            .push_bind(o.is_custom)
            .push_bind(o.sharing_model.to_string())
            .push_bind(o.app_id.clone())
            .push_bind(o.path_field.clone())
            .push_bind(Json(o.list_fields.clone()))
            .push_bind(o.theme_color.clone())
            .push_bind(o.table_type().as_str())
            .push("CURRENT_TIMESTAMP")
            .push("CURRENT_TIMESTAMP");
    });
    if upsert {
        qb.push(OBJECT_CONFLICT);
    }
    qb
}

fn field_upsert(fields: &[FieldMetadata]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(FIELD_COLUMNS);
    qb.push_values(fields, |mut b, f| {
        b.push_bind(f.id.clone())
            .push_bind(f.object_id.clone())
            .push_bind(f.api_name.clone())
            .push_bind(f.label.clone())
            .push_bind(f.field_type.as_str())
            .push_bind(f.required)
            .push_bind(f.is_unique)
            .push_bind(f.is_system)
            .push_bind(f.is_name_field)
            .push_bind(f.default_value.clone())
            .push_bind(f.help_text.clone())
            .push_bind(Json(f.options.clone()))
            .push_bind(f.min_length)
            .push_bind(f.max_length)
            .push_bind(Json(f.reference_to.clone()))
            .push_bind(f.is_polymorphic)
            .push_bind(f.is_master_detail)
            .push_bind(f.delete_rule.map(|r| r.to_string()))
            .push_bind(f.relationship_name.clone())
            .push_bind(f.formula.clone())
            .push_bind(f.return_type.map(|t| t.as_str()))
            .push_bind(f.rollup_config.clone())
            .push("CURRENT_TIMESTAMP")
            .push("CURRENT_TIMESTAMP");
    });
    qb.push(FIELD_CONFLICT);
    qb
}

fn table_insert(tables: &[TableDefinition]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(TABLE_COLUMNS);
    qb.push_values(tables, |mut b, t| {
        b.push_bind(id_generator::table_id(&t.table_name))
            .push_bind(t.table_name.clone())
            .push_bind(t.table_type.as_str())
            .push_bind(t.category.clone())
            .push_bind(t.description.clone())
            .push_bind(t.is_managed)
            .push_bind(t.schema_version.clone())
            .push_bind(CREATED_BY_BOOTSTRAP)
            .push("CURRENT_TIMESTAMP")
            .push("CURRENT_TIMESTAMP");
    });
    qb.push(TABLE_CONFLICT);
    qb
}

/// オブジェクトを api_name 単位で upsert する。
pub async fn upsert_object<'e, E>(executor: E, object: &ObjectMetadata) -> Result<(), SchemaError>
where
    E: PgExecutor<'e>,
{
    object_insert(std::slice::from_ref(object), true)
        .build()
        .execute(executor)
        .await?;
    Ok(())
}

/// オブジェクトを挿入する。一意制約違反は `DuplicateObject` にする。
pub async fn insert_object_strict<'e, E>(
    executor: E,
    object: &ObjectMetadata,
) -> Result<(), SchemaError>
where
    E: PgExecutor<'e>,
{
    object_insert(std::slice::from_ref(object), false)
        .build()
        .execute(executor)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                SchemaError::DuplicateObject(object.api_name.clone())
            }
            _ => SchemaError::from(e),
        })?;
    Ok(())
}

pub async fn upsert_field_with_ids<'e, E>(
    executor: E,
    field: &FieldMetadata,
) -> Result<(), SchemaError>
where
    E: PgExecutor<'e>,
{
    field_upsert(std::slice::from_ref(field))
        .build()
        .execute(executor)
        .await?;
    Ok(())
}

/// テーブルレジストリへ一括登録する。既存行は last_modified_date だけを更新する。
pub async fn register_tables<'e, E>(
    executor: E,
    tables: &[TableDefinition],
) -> Result<(), SchemaError>
where
    E: PgExecutor<'e>,
{
    if tables.is_empty() {
        return Ok(());
    }
    table_insert(tables).build().execute(executor).await?;
    Ok(())
}

pub async fn batch_upsert_objects<'a, A>(
    conn: A,
    objects: &[ObjectMetadata],
    chunk_size: usize,
) -> Result<(), SchemaError>
where
    A: Acquire<'a, Database = Postgres>,
{
    if objects.is_empty() {
        return Ok(());
    }
    let mut conn = conn.acquire().await?;
    for chunk in objects.chunks(chunk_size.max(1)) {
        object_insert(chunk, true)
            .build()
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// フィールドを chunk_size 行ずつ upsert する。
pub async fn batch_upsert_fields<'a, A>(
    conn: A,
    fields: &[FieldMetadata],
    chunk_size: usize,
) -> Result<(), SchemaError>
where
    A: Acquire<'a, Database = Postgres>,
{
    if fields.is_empty() {
        return Ok(());
    }
    let mut conn = conn.acquire().await?;
    for chunk in fields.chunks(chunk_size.max(1)) {
        field_upsert(chunk).build().execute(&mut *conn).await?;
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct TableRegistryRow {
    id: String,
    table_name: String,
    table_type: String,
    category: Option<String>,
    description: Option<String>,
    is_managed: bool,
    schema_version: Option<String>,
    created_by: String,
    created_date: DateTime<Utc>,
    last_modified_date: DateTime<Utc>,
}

impl From<TableRegistryRow> for TableRegistryItem {
    fn from(row: TableRegistryRow) -> Self {
        Self {
            id: row.id,
            table_name: row.table_name,
            table_type: row.table_type,
            category: row.category,
            description: row.description,
            is_managed: row.is_managed,
            schema_version: row.schema_version,
            created_by: row.created_by,
            created_date: row.created_date,
            last_modified_date: row.last_modified_date,
        }
    }
}

/// MetadataRegistrarPostgres はプールに対してレジストリ操作を行う。
pub struct MetadataRegistrarPostgres {
    pool: PgPool,
    tx_manager: TransactionManager,
    field_chunk_size: usize,
    tx_max_retries: u32,
}

impl MetadataRegistrarPostgres {
    pub fn new(pool: PgPool, config: &SchemaEngineConfig) -> Self {
        let tx_manager = TransactionManager::new(
            pool.clone(),
            Duration::from_millis(config.retry_initial_delay_ms),
        );
        Self {
            pool,
            tx_manager,
            field_chunk_size: config.field_chunk_size,
            tx_max_retries: config.tx_max_retries,
        }
    }
}

#[async_trait]
impl MetadataRegistrar for MetadataRegistrarPostgres {
    async fn upsert_object(&self, object: &ObjectMetadata) -> Result<(), SchemaError> {
        upsert_object(&self.pool, object).await
    }

    async fn insert_object_strict(&self, object: &ObjectMetadata) -> Result<(), SchemaError> {
        insert_object_strict(&self.pool, object).await
    }

    async fn upsert_field_with_ids(&self, field: &FieldMetadata) -> Result<(), SchemaError> {
        upsert_field_with_ids(&self.pool, field).await
    }

    async fn batch_upsert_objects(&self, objects: &[ObjectMetadata]) -> Result<(), SchemaError> {
        batch_upsert_objects(&self.pool, objects, self.field_chunk_size).await
    }

    async fn batch_upsert_fields(&self, fields: &[FieldMetadata]) -> Result<(), SchemaError> {
        batch_upsert_fields(&self.pool, fields, self.field_chunk_size).await
    }

    async fn register_tables(&self, tables: &[TableDefinition]) -> Result<(), SchemaError> {
        register_tables(&self.pool, tables).await
    }

    async fn register_table_bundle(
        &self,
        table: &TableDefinition,
        object: &ObjectMetadata,
        fields: &[FieldMetadata],
    ) -> Result<(), SchemaError> {
        let table_name = table.table_name.clone();
        let field_count = fields.len();
        let table = table.clone();
        let object = object.clone();
        let fields = fields.to_vec();
        let chunk_size = self.field_chunk_size;

        self.tx_manager
            .with_retry(self.tx_max_retries, move |tx| {
                let table = table.clone();
                let object = object.clone();
                let fields = fields.clone();
                Box::pin(async move {
                    register_tables(&mut **tx, std::slice::from_ref(&table)).await?;
                    insert_object_strict(&mut **tx, &object).await?;
                    batch_upsert_fields(&mut **tx, &fields, chunk_size).await?;
                    Ok::<(), SchemaError>(())
                })
            })
            .await?;

        info!(table = %table_name, fields = field_count, "table bundle registered");
        Ok(())
    }

    async fn find_object_id(&self, api_name: &str) -> Result<Option<String>, SchemaError> {
        let id = sqlx::query_scalar::<_, String>(
            "SELECT id FROM \"_System_Object\" WHERE api_name = $1",
        )
        .bind(api_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn field_exists(&self, table_name: &str, column_name: &str) -> Result<bool, SchemaError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM \"_System_Field\" f \
             LEFT JOIN \"_System_Object\" o ON o.id = f.object_id \
             WHERE f.api_name = $2 AND (o.api_name = $1 OR f.object_id = $3))",
        )
        .bind(table_name)
        .bind(column_name)
        .bind(id_generator::object_id(table_name))
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn expected_columns(&self, table_name: &str) -> Result<Vec<String>, SchemaError> {
        let columns = sqlx::query_scalar::<_, String>(
            "SELECT f.api_name FROM \"_System_Field\" f \
             JOIN \"_System_Object\" o ON o.id = f.object_id \
             WHERE o.api_name = $1 ORDER BY f.api_name",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    async fn managed_tables(&self) -> Result<Vec<String>, SchemaError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT table_name FROM \"_System_Table\" WHERE is_managed = TRUE ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn table_registry(&self) -> Result<Vec<TableRegistryItem>, SchemaError> {
        let rows = sqlx::query_as::<_, TableRegistryRow>(
            "SELECT id, table_name, table_type, category, description, is_managed, \
             schema_version, created_by, created_date, last_modified_date \
             FROM \"_System_Table\" ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_field(&self, table_name: &str, column_name: &str) -> Result<(), SchemaError> {
        sqlx::query(
            "DELETE FROM \"_System_Field\" WHERE api_name = $2 AND object_id IN \
             (SELECT id FROM \"_System_Object\" WHERE api_name = $1 UNION SELECT $3)",
        )
        .bind(table_name)
        .bind(column_name)
        .bind(id_generator::object_id(table_name))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unregister_table(&self, table_name: &str) {
        if let Err(e) = sqlx::query("DELETE FROM \"_System_Table\" WHERE table_name = $1")
            .bind(table_name)
            .execute(&self.pool)
            .await
        {
            warn!(table = %table_name, error = %e, "failed to delete table registry row");
        }

        if let Err(e) = sqlx::query(
            "DELETE FROM \"_System_Field\" WHERE object_id IN \
             (SELECT id FROM \"_System_Object\" WHERE api_name = $1 UNION SELECT $2)",
        )
        .bind(table_name)
        .bind(id_generator::object_id(table_name))
        .execute(&self.pool)
        .await
        {
            warn!(table = %table_name, error = %e, "failed to delete field registry rows");
        }

        if let Err(e) = sqlx::query("DELETE FROM \"_System_Object\" WHERE api_name = $1")
            .bind(table_name)
            .execute(&self.pool)
            .await
        {
            warn!(table = %table_name, error = %e, "failed to delete object registry row");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::ColumnDefinition;
    use crate::domain::service::field_mapper;
    use crate::domain::value_object::FieldType;

    fn invoice() -> ObjectMetadata {
        ObjectMetadata::new("invoice", "Invoice", "Invoices")
    }

    #[test]
    fn test_strict_insert_has_no_conflict_clause() {
        let strict = object_insert(&[invoice()], false);
        assert!(!strict.sql().contains("ON CONFLICT"));

        let upsert = object_insert(&[invoice()], true);
        assert!(upsert.sql().contains("ON CONFLICT (api_name) DO UPDATE"));
    }

    #[test]
    fn test_field_upsert_binds_every_row() {
        let object = invoice();
        let fields: Vec<_> = ["amount", "due_date"]
            .iter()
            .map(|name| {
                field_mapper::prepare_field(
                    &object.id,
                    &object.api_name,
                    &ColumnDefinition::logical(*name, FieldType::Text),
                )
            })
            .collect();

        let qb = field_upsert(&fields);
        let sql = qb.sql();
        assert!(sql.contains("ON CONFLICT (object_id, api_name) DO UPDATE"));
        // 1行あたり22個のバインド
        assert!(sql.contains("$44"));
        assert!(!sql.contains("$45"));
    }

    #[test]
    fn test_table_insert_only_refreshes_timestamp() {
        let def = TableDefinition::new("invoice", vec![ColumnDefinition::new("id", "VARCHAR(36)")]);
        let qb = table_insert(&[def]);
        assert!(qb.sql().ends_with(TABLE_CONFLICT));
    }
}
