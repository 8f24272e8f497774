use async_trait::async_trait;
use sqlx::{Executor, PgConnection, PgPool};
use tracing::{info, warn};

use crate::domain::entity::DdlStatement;
use crate::domain::error::SchemaError;
use crate::domain::repository::DdlExecutor;

/// 外部キー検査をトランザクション単位で止める文。終了時に自動で元へ戻る。
const SUSPEND_FK_CHECKS: &str = "SET LOCAL session_replication_role = replica";
const SUSPEND_SAVEPOINT: &str = "suspend_fk_checks";
const FOREIGN_KEY_SAVEPOINT: &str = "add_foreign_key";

/// セーブポイント内で1文を実行する。失敗時はセーブポイントまで戻し、
/// トランザクション自体は継続できる状態にする。
async fn execute_in_savepoint(
    conn: &mut PgConnection,
    savepoint: &str,
    sql: &str,
) -> Result<(), sqlx::Error> {
    (&mut *conn)
        .execute(sqlx::raw_sql(&format!("SAVEPOINT {savepoint}")))
        .await?;
    match (&mut *conn).execute(sqlx::raw_sql(sql)).await {
        Ok(_) => {
            (&mut *conn)
                .execute(sqlx::raw_sql(&format!("RELEASE SAVEPOINT {savepoint}")))
                .await?;
            Ok(())
        }
        Err(e) => {
            (&mut *conn)
                .execute(sqlx::raw_sql(&format!("ROLLBACK TO SAVEPOINT {savepoint}")))
                .await?;
            Err(e)
        }
    }
}

async fn run_table_statements(
    conn: &mut PgConnection,
    statements: &[DdlStatement],
) -> Result<(), SchemaError> {
    if let Err(e) = execute_in_savepoint(conn, SUSPEND_SAVEPOINT, SUSPEND_FK_CHECKS).await {
        warn!(error = %e, "could not suspend foreign key checks, continuing with checks enabled");
    }

    for statement in statements {
        info!(statement = %statement.sql, "executing ddl");
        if !statement.is_foreign_key() {
            (&mut *conn)
                .execute(sqlx::raw_sql(&statement.sql))
                .await
                .map_err(|e| SchemaError::execution_from_sqlx(statement.sql.clone(), &e))?;
            continue;
        }
        if let Err(e) = execute_in_savepoint(conn, FOREIGN_KEY_SAVEPOINT, &statement.sql).await {
            let err = SchemaError::execution_from_sqlx(statement.sql.clone(), &e);
            if !err.is_duplicate_constraint() {
                return Err(err);
            }
            info!(statement = %statement.sql, "foreign key already exists, skipping");
        }
    }
    Ok(())
}

/// DdlExecutorPostgres は DDL を単純問い合わせプロトコルで実行する。
pub struct DdlExecutorPostgres {
    pool: PgPool,
}

impl DdlExecutorPostgres {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DdlExecutor for DdlExecutorPostgres {
    async fn execute(&self, statement: &DdlStatement) -> Result<(), SchemaError> {
        info!(statement = %statement.sql, "executing ddl");
        sqlx::raw_sql(&statement.sql)
            .execute(&self.pool)
            .await
            .map_err(|e| SchemaError::execution_from_sqlx(statement.sql.clone(), &e))?;
        Ok(())
    }

    /// 文群を1トランザクションで実行する。途中で失敗するか Future が破棄されると
    /// ロールバックされ、テーブルもセッション設定も残らない。
    async fn execute_table_ddl(&self, statements: &[DdlStatement]) -> Result<(), SchemaError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SchemaError::execution_from_sqlx("BEGIN", &e))?;

        if let Err(e) = run_table_statements(&mut tx, statements).await {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "failed to roll back table ddl transaction");
            }
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|e| SchemaError::execution_from_sqlx("COMMIT", &e))
    }
}
