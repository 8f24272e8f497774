use async_trait::async_trait;

use crate::domain::entity::{FieldMetadata, ObjectMetadata, TableDefinition, TableRegistryItem};
use crate::domain::error::SchemaError;

/// MetadataRegistrar はメタデータレジストリ（`_System_Table` / `_System_Object` / `_System_Field`）への
/// 読み書きを担うトレイト。書き込みはすべて冪等な upsert とし、strict insert だけが重複を報告する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataRegistrar: Send + Sync {
    /// オブジェクトを api_name 単位で upsert する。
    async fn upsert_object(&self, object: &ObjectMetadata) -> Result<(), SchemaError>;

    /// オブジェクトを挿入する。既存の api_name なら `DuplicateObject` を返す。
    async fn insert_object_strict(&self, object: &ObjectMetadata) -> Result<(), SchemaError>;

    /// フィールドを (object_id, api_name) 単位で upsert する。id は呼び出し側が決める。
    async fn upsert_field_with_ids(&self, field: &FieldMetadata) -> Result<(), SchemaError>;

    async fn batch_upsert_objects(&self, objects: &[ObjectMetadata]) -> Result<(), SchemaError>;

    /// フィールドをチャンク単位でまとめて upsert する。
    async fn batch_upsert_fields(&self, fields: &[FieldMetadata]) -> Result<(), SchemaError>;

    /// テーブルレジストリへ一括登録する。既存行は最終更新日時だけを更新する。
    async fn register_tables(&self, tables: &[TableDefinition]) -> Result<(), SchemaError>;

    /// テーブル登録・オブジェクト strict insert・フィールド upsert を1トランザクションで行う。
    async fn register_table_bundle(
        &self,
        table: &TableDefinition,
        object: &ObjectMetadata,
        fields: &[FieldMetadata],
    ) -> Result<(), SchemaError>;

    /// api_name に対応するオブジェクト id を返す。
    async fn find_object_id(&self, api_name: &str) -> Result<Option<String>, SchemaError>;

    /// テーブルのカラムがフィールドとして登録済みか。
    async fn field_exists(&self, table_name: &str, column_name: &str) -> Result<bool, SchemaError>;

    /// レジストリ上でテーブルに存在するはずのカラム名一覧。
    async fn expected_columns(&self, table_name: &str) -> Result<Vec<String>, SchemaError>;

    /// 管理対象として登録されたテーブル名一覧。
    async fn managed_tables(&self) -> Result<Vec<String>, SchemaError>;

    async fn table_registry(&self) -> Result<Vec<TableRegistryItem>, SchemaError>;

    async fn delete_field(&self, table_name: &str, column_name: &str) -> Result<(), SchemaError>;

    /// テーブルに紐付くレジストリ行をすべて削除する。失敗は警告ログに留める。
    async fn unregister_table(&self, table_name: &str);
}
