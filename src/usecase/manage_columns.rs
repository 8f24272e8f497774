use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::entity::{ColumnDefinition, ColumnState};
use crate::domain::error::SchemaError;
use crate::domain::repository::{DdlExecutor, MetadataRegistrar, SchemaCatalog};
use crate::domain::service::{ddl_builder, field_mapper, id_generator, naming_validator};

/// ManageColumnsUseCase はカラム単位のスキーマ変更を、物理スキーマとレジストリの
/// 両方を確認したうえで行う。同じ要求を再実行しても同じ状態に収束する。
pub struct ManageColumnsUseCase {
    catalog: Arc<dyn SchemaCatalog>,
    executor: Arc<dyn DdlExecutor>,
    registrar: Arc<dyn MetadataRegistrar>,
}

impl ManageColumnsUseCase {
    pub fn new(
        catalog: Arc<dyn SchemaCatalog>,
        executor: Arc<dyn DdlExecutor>,
        registrar: Arc<dyn MetadataRegistrar>,
    ) -> Self {
        Self {
            catalog,
            executor,
            registrar,
        }
    }

    /// 物理スキーマとレジストリの両側からカラムを分類する。
    pub async fn probe(&self, table: &str, column: &str) -> Result<ColumnState, SchemaError> {
        let physical = self.catalog.column_exists(table, column).await?;
        let registered = self.registrar.field_exists(table, column).await?;
        Ok(ColumnState::classify(physical, registered))
    }

    async fn resolve_object_id(&self, table: &str) -> Result<String, SchemaError> {
        Ok(self
            .registrar
            .find_object_id(table)
            .await?
            .unwrap_or_else(|| id_generator::object_id(table)))
    }

    async fn register_field(&self, table: &str, col: &ColumnDefinition) -> Result<(), SchemaError> {
        let object_id = self.resolve_object_id(table).await?;
        let field = field_mapper::prepare_field(&object_id, table, col);
        self.registrar.upsert_field_with_ids(&field).await
    }

    /// このリクエストで追加したカラムを削除して元に戻す。
    async fn compensate_add(
        &self,
        table: &str,
        column: &str,
        original: SchemaError,
    ) -> SchemaError {
        warn!(table = %table, column = %column, error = %original, "rolling back added column");
        match self
            .executor
            .execute(&ddl_builder::build_drop_column(table, column))
            .await
        {
            Ok(()) => original,
            Err(compensation) => {
                error!(
                    table = %table,
                    column = %column,
                    error = %original,
                    compensation_error = %compensation,
                    "failed to drop column after metadata failure, schema and registry are inconsistent"
                );
                SchemaError::critical(original, compensation)
            }
        }
    }

    /// カラムを追加してフィールドを登録する。戻り値は処理前の状態。
    ///
    /// 物理的に既存のカラム（Synced / Orphan）は DDL を省略してレジストリだけを更新し、
    /// 失敗しても削除しない。新規に作ったカラムは登録失敗時に削除する。
    pub async fn add_column(
        &self,
        table: &str,
        col: &ColumnDefinition,
    ) -> Result<ColumnState, SchemaError> {
        naming_validator::validate_table_name(table)?;
        naming_validator::validate_field_definition(col)?;

        let state = self.probe(table, &col.name).await?;
        let created = if state.physically_exists() {
            info!(table = %table, column = %col.name, state = %state, "column already exists, skipping ddl");
            false
        } else {
            self.executor
                .execute(&ddl_builder::build_add_column(table, col))
                .await?;
            true
        };

        // 既存カラムでも毎回試みる。ADD COLUMN 直後に中断した場合も制約まで収束させる
        if let Some(fk) = ddl_builder::build_add_reference_constraint(table, col) {
            match self.executor.execute(&fk).await {
                Ok(()) => {}
                Err(e) if e.is_duplicate_constraint() => {
                    info!(table = %table, column = %col.name, "foreign key already exists, skipping");
                }
                Err(e) if created => return Err(self.compensate_add(table, &col.name, e).await),
                Err(e) => {
                    warn!(
                        table = %table,
                        column = %col.name,
                        state = %state,
                        error = %e,
                        "failed to add foreign key, keeping pre-existing column"
                    );
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.register_field(table, col).await {
            if created {
                return Err(self.compensate_add(table, &col.name, e).await);
            }
            warn!(
                table = %table,
                column = %col.name,
                state = %state,
                error = %e,
                "field registration failed, keeping pre-existing column"
            );
            return Err(e);
        }

        info!(table = %table, column = %col.name, state = %state, created, "column added");
        Ok(state)
    }

    /// カラムが物理的に無ければ追加する。追加した場合は true。
    pub async fn ensure_column(
        &self,
        table: &str,
        col: &ColumnDefinition,
    ) -> Result<bool, SchemaError> {
        if self.catalog.column_exists(table, &col.name).await? {
            return Ok(false);
        }
        self.add_column(table, col).await?;
        Ok(true)
    }

    /// カラムを削除してフィールド登録を消す。戻り値は処理前の状態。
    /// 物理的に存在しない（Ghost / Absent）場合は DDL を省略する。
    pub async fn drop_column(&self, table: &str, column: &str) -> Result<ColumnState, SchemaError> {
        naming_validator::validate_table_name(table)?;
        if !naming_validator::is_system_table(table) {
            naming_validator::validate_column_name(column)?;
        }

        let state = self.probe(table, column).await?;
        if state.physically_exists() {
            self.executor
                .execute(&ddl_builder::build_drop_column(table, column))
                .await?;
        } else {
            info!(table = %table, column = %column, state = %state, "column not present physically, skipping ddl");
        }

        if let Err(e) = self.registrar.delete_field(table, column).await {
            warn!(table = %table, column = %column, error = %e, "failed to delete field metadata");
        }

        info!(table = %table, column = %column, state = %state, "column dropped");
        Ok(state)
    }

    /// カラムの型を変更（拡張のみ）し、フィールドを更新する。
    /// メタデータ更新の失敗は物理変更を戻さず `MetadataStale` で返す。
    pub async fn modify_column(
        &self,
        table: &str,
        col: &ColumnDefinition,
    ) -> Result<(), SchemaError> {
        naming_validator::validate_table_name(table)?;
        naming_validator::validate_field_definition(col)?;

        if !self.catalog.column_exists(table, &col.name).await? {
            return Err(SchemaError::validation(format!(
                "column '{}' does not exist on table '{}'",
                col.name, table
            )));
        }

        self.executor
            .execute(&ddl_builder::build_alter_column_type(table, col))
            .await?;

        if let Err(e) = self.register_field(table, col).await {
            warn!(
                table = %table,
                column = %col.name,
                error = %e,
                "column type changed but field metadata update failed"
            );
            return Err(SchemaError::MetadataStale {
                table: table.to_string(),
                column: col.name.clone(),
                message: e.to_string(),
            });
        }

        info!(table = %table, column = %col.name, "column modified");
        Ok(())
    }
}
