use async_trait::async_trait;

use crate::domain::error::SchemaError;

/// SchemaCatalog は稼働中データベースの物理スキーマを参照するトレイト。
/// 対象は現在のスキーマのみ。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// テーブルが物理的に存在するか。
    async fn table_exists(&self, table_name: &str) -> Result<bool, SchemaError>;

    /// カラムが物理的に存在するか。
    async fn column_exists(&self, table_name: &str, column_name: &str)
        -> Result<bool, SchemaError>;

    /// テーブルの物理カラム名一覧。
    async fn list_columns(&self, table_name: &str) -> Result<Vec<String>, SchemaError>;

    /// 現在のスキーマにあるテーブル名一覧。
    async fn list_tables(&self) -> Result<Vec<String>, SchemaError>;
}
