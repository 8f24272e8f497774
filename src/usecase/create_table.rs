use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::entity::{DdlStatement, ObjectMetadata, TableDefinition};
use crate::domain::error::SchemaError;
use crate::domain::repository::{DdlExecutor, MetadataRegistrar};
use crate::domain::service::{ddl_builder, field_mapper, naming_validator};

/// CreateTableUseCase は物理テーブルの作成と、メタデータ付きの厳密な作成を担う。
pub struct CreateTableUseCase {
    executor: Arc<dyn DdlExecutor>,
    registrar: Arc<dyn MetadataRegistrar>,
}

impl CreateTableUseCase {
    pub fn new(executor: Arc<dyn DdlExecutor>, registrar: Arc<dyn MetadataRegistrar>) -> Self {
        Self {
            executor,
            registrar,
        }
    }

    fn validate(def: &TableDefinition) -> Result<(), SchemaError> {
        naming_validator::validate_table_name(&def.table_name)?;
        for col in &def.columns {
            naming_validator::validate_field_definition(col)?;
        }
        Ok(())
    }

    /// 物理テーブルだけを作成する。レジストリには書き込まない。
    /// 外部キーも同じトランザクションで追加するため、参照先は既に存在している必要がある。
    pub async fn create_physical_table(&self, def: &TableDefinition) -> Result<(), SchemaError> {
        Self::validate(def)?;
        self.executor
            .execute_table_ddl(&Self::physical_statements(def))
            .await?;
        info!(table = %def.table_name, columns = def.columns.len(), "physical table created");
        Ok(())
    }

    /// 外部キーを除いたテーブル本体とインデックスだけを作成する。
    /// 相互参照するテーブル群は、全件作成後に `add_foreign_keys` で制約を張る。
    pub async fn create_table_structure(&self, def: &TableDefinition) -> Result<(), SchemaError> {
        Self::validate(def)?;
        self.executor
            .execute_table_ddl(&ddl_builder::build_create_table(def))
            .await?;
        info!(table = %def.table_name, columns = def.columns.len(), "table structure created");
        Ok(())
    }

    /// テーブル群の外部キーを1トランザクションでまとめて追加する。
    pub async fn add_foreign_keys(&self, defs: &[TableDefinition]) -> Result<(), SchemaError> {
        let statements: Vec<_> = defs
            .iter()
            .flat_map(ddl_builder::build_table_foreign_keys)
            .collect();
        if statements.is_empty() {
            return Ok(());
        }
        self.executor.execute_table_ddl(&statements).await?;
        info!(constraints = statements.len(), "foreign keys added");
        Ok(())
    }

    fn physical_statements(def: &TableDefinition) -> Vec<DdlStatement> {
        let mut statements = ddl_builder::build_create_table(def);
        statements.extend(ddl_builder::build_table_foreign_keys(def));
        statements
    }

    /// 物理テーブルを作成し、テーブル・オブジェクト・フィールドを1トランザクションで登録する。
    ///
    /// 物理作成の失敗はロールバック済みなのでそのまま返す。登録に失敗した場合だけテーブルを削除し、
    /// 削除にも失敗した場合は重大な不整合として返す。
    pub async fn create_table_with_strict_metadata(
        &self,
        def: &TableDefinition,
        object: &ObjectMetadata,
    ) -> Result<(), SchemaError> {
        Self::validate(def)?;

        let mut object = object.clone();
        object.id = object.resolved_id();
        let fields: Vec<_> = field_mapper::prepare_fields(&object, &def.columns)
            .into_iter()
            .map(|f| f.with_object_id(object.id.clone()))
            .collect();

        if let Err(e) = self
            .executor
            .execute_table_ddl(&Self::physical_statements(def))
            .await
        {
            warn!(table = %def.table_name, error = %e, "physical table creation failed");
            return Err(e);
        }

        let Err(original) = self
            .registrar
            .register_table_bundle(def, &object, &fields)
            .await
        else {
            info!(
                table = %def.table_name,
                object_id = %object.id,
                fields = fields.len(),
                "table created with metadata"
            );
            return Ok(());
        };

        warn!(table = %def.table_name, error = %original, "metadata registration failed, dropping table");
        match self
            .executor
            .execute(&ddl_builder::build_drop_table(&def.table_name))
            .await
        {
            Ok(()) => Err(original),
            Err(compensation) => {
                error!(
                    table = %def.table_name,
                    error = %original,
                    compensation_error = %compensation,
                    "failed to drop table after metadata failure, schema and registry are inconsistent"
                );
                Err(SchemaError::critical(original, compensation))
            }
        }
    }
}
