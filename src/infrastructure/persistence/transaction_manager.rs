use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

use crate::domain::error::SchemaError;

/// デッドロック検出。
pub const SQLSTATE_DEADLOCK: &str = "40P01";
/// ロック取得不可。
pub const SQLSTATE_LOCK_NOT_AVAILABLE: &str = "55P03";
/// シリアライゼーション失敗。
pub const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// トランザクション内で実行する処理が返す Future。
pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, SchemaError>> + Send + 't>>;

/// ロック競合によって失敗し、再試行すれば成功し得るエラーかどうか。
pub fn is_retryable_conflict(err: &SchemaError) -> bool {
    matches!(
        err.sqlstate(),
        Some(SQLSTATE_DEADLOCK | SQLSTATE_LOCK_NOT_AVAILABLE | SQLSTATE_SERIALIZATION_FAILURE)
    )
}

/// TransactionManager はトランザクションの開始・確定・取り消しと、競合時の再試行を担う。
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
    initial_delay: Duration,
}

impl TransactionManager {
    pub fn new(pool: PgPool, initial_delay: Duration) -> Self {
        Self {
            pool,
            initial_delay,
        }
    }

    /// attempt 回目（0 始まり）の再試行前に待つ時間。
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// 処理を1つのトランザクションで実行する。エラー時はロールバックして元のエラーを返す。
    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T, SchemaError>
    where
        T: Send,
        F: for<'t> Fn(&'t mut Transaction<'static, Postgres>) -> TxFuture<'t, T> + Send + Sync,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(e)
            }
        }
    }

    /// ロック競合で失敗した場合に指数バックオフで最大 max_retries 回まで再試行する。
    pub async fn with_retry<T, F>(&self, max_retries: u32, f: F) -> Result<T, SchemaError>
    where
        T: Send,
        F: for<'t> Fn(&'t mut Transaction<'static, Postgres>) -> TxFuture<'t, T> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match self.with_transaction(&f).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_retries && is_retryable_conflict(&e) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "transaction conflict, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
