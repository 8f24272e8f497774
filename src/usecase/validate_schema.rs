use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::entity::{SchemaDrift, SchemaHealth};
use crate::domain::error::SchemaError;
use crate::domain::repository::{MetadataRegistrar, SchemaCatalog};

/// ValidateSchemaUseCase はレジストリと物理スキーマの乖離を読み取り専用で監査する。
pub struct ValidateSchemaUseCase {
    catalog: Arc<dyn SchemaCatalog>,
    registrar: Arc<dyn MetadataRegistrar>,
}

impl ValidateSchemaUseCase {
    pub fn new(catalog: Arc<dyn SchemaCatalog>, registrar: Arc<dyn MetadataRegistrar>) -> Self {
        Self { catalog, registrar }
    }

    /// レジストリに登録済みで物理的に存在しないカラムを報告する。
    /// 物理的にのみ存在するカラムは報告しない。
    pub async fn validate_schema(&self, table: &str) -> Result<SchemaDrift, SchemaError> {
        let expected = self.registrar.expected_columns(table).await?;
        if expected.is_empty() {
            return Ok(SchemaDrift {
                table_name: table.to_string(),
                missing_columns: Vec::new(),
            });
        }

        let actual: HashSet<String> = self
            .catalog
            .list_columns(table)
            .await?
            .into_iter()
            .collect();
        let missing_columns: Vec<String> = expected
            .into_iter()
            .filter(|c| !actual.contains(c))
            .collect();

        let drift = SchemaDrift {
            table_name: table.to_string(),
            missing_columns,
        };
        if drift.has_drift() {
            warn!(table = %table, missing = ?drift.missing_columns, "schema drift detected");
        }
        Ok(drift)
    }

    /// 管理対象テーブルが物理的に存在するかを確認する。
    pub async fn validate_schema_registry(&self) -> Result<SchemaHealth, SchemaError> {
        let managed = self.registrar.managed_tables().await?;
        let actual = self.catalog.list_tables().await?;
        let present: HashSet<&str> = actual.iter().map(String::as_str).collect();

        let missing: Vec<String> = managed
            .iter()
            .filter(|t| !present.contains(t.as_str()))
            .cloned()
            .collect();

        let health = SchemaHealth::from_counts(managed.len(), actual.len(), missing);
        if health.is_healthy() {
            info!(
                expected = health.expected_count,
                actual = health.actual_count,
                "schema registry healthy"
            );
        } else {
            warn!(missing = ?health.missing_tables, "managed tables missing from schema");
        }
        Ok(health)
    }
}
