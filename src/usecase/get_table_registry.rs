use std::sync::Arc;

use crate::domain::entity::TableRegistryItem;
use crate::domain::error::SchemaError;
use crate::domain::repository::MetadataRegistrar;

/// GetTableRegistryUseCase はテーブルレジストリの一覧を返す。
pub struct GetTableRegistryUseCase {
    registrar: Arc<dyn MetadataRegistrar>,
}

impl GetTableRegistryUseCase {
    pub fn new(registrar: Arc<dyn MetadataRegistrar>) -> Self {
        Self { registrar }
    }

    pub async fn execute(&self) -> Result<Vec<TableRegistryItem>, SchemaError> {
        self.registrar.table_registry().await
    }
}
