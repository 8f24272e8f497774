use std::sync::Arc;

use tracing::info;

use crate::domain::error::SchemaError;
use crate::domain::repository::{DdlExecutor, MetadataRegistrar};
use crate::domain::service::{ddl_builder, naming_validator};

/// DropTableUseCase は物理テーブルを削除し、関連するレジストリ行を片付ける。
pub struct DropTableUseCase {
    executor: Arc<dyn DdlExecutor>,
    registrar: Arc<dyn MetadataRegistrar>,
}

impl DropTableUseCase {
    pub fn new(executor: Arc<dyn DdlExecutor>, registrar: Arc<dyn MetadataRegistrar>) -> Self {
        Self {
            executor,
            registrar,
        }
    }

    /// レジストリ側の削除失敗は警告に留め、物理削除の結果だけを返す。
    pub async fn execute(&self, table: &str) -> Result<(), SchemaError> {
        naming_validator::validate_table_name(table)?;
        self.executor
            .execute(&ddl_builder::build_drop_table(table))
            .await?;
        self.registrar.unregister_table(table).await;
        info!(table = %table, "table dropped");
        Ok(())
    }
}
