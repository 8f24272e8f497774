use async_trait::async_trait;

use crate::domain::entity::DdlStatement;
use crate::domain::error::SchemaError;

/// DdlExecutor は組み立て済み DDL を実行するトレイト。
/// 失敗は実行した文を添えて `SchemaError::Execution` で返す。リトライも補償も行わない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DdlExecutor: Send + Sync {
    /// DDL 文を1つ実行する。
    async fn execute(&self, statement: &DdlStatement) -> Result<(), SchemaError>;

    /// テーブル作成用の文群を1トランザクションで順に実行する。すべて適用されるか、何も残らない。
    /// 実行中は外部キー検査を止める。既に存在する外部キー制約の追加は成功として扱う。
    async fn execute_table_ddl(&self, statements: &[DdlStatement]) -> Result<(), SchemaError>;
}
