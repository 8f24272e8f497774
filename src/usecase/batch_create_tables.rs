use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::entity::TableDefinition;
use crate::domain::error::SchemaError;
use crate::domain::repository::MetadataRegistrar;
use crate::usecase::create_table::CreateTableUseCase;
use crate::usecase::drop_table::DropTableUseCase;

/// 同時に実行するテーブル作成数の既定値。
pub const DEFAULT_BATCH_CONCURRENCY: usize = 10;

enum UnitOutcome {
    Created,
    Skipped,
    Failed(SchemaError),
}

/// BatchCreateTablesUseCase は複数テーブルの物理作成を並行実行し、
/// 全件成功した場合にだけ外部キーを張ってテーブルレジストリへまとめて登録する。
pub struct BatchCreateTablesUseCase {
    create_table: Arc<CreateTableUseCase>,
    drop_table: Arc<DropTableUseCase>,
    registrar: Arc<dyn MetadataRegistrar>,
    concurrency: usize,
}

impl BatchCreateTablesUseCase {
    pub fn new(
        create_table: Arc<CreateTableUseCase>,
        drop_table: Arc<DropTableUseCase>,
        registrar: Arc<dyn MetadataRegistrar>,
        concurrency: usize,
    ) -> Self {
        Self {
            create_table,
            drop_table,
            registrar,
            concurrency: concurrency.max(1),
        }
    }

    /// テーブル群を作成する。
    ///
    /// 各ユニットはテーブル本体とインデックスを1トランザクションで作成し、失敗したユニットは何も残さない。
    /// 外部キーは全ユニットの成功後にまとめて追加するので、テーブル同士の参照順序には依存しない。
    /// どれか1件でも失敗すると全ユニットの完了を待ってから作成済みテーブルをすべて削除し、
    /// 最初のエラーを返す。キャンセル時は未着手のユニットを飛ばし、補償せずに `Cancelled` を返す。
    pub async fn execute(
        &self,
        defs: &[TableDefinition],
        cancel: &CancellationToken,
    ) -> Result<(), SchemaError> {
        if defs.is_empty() {
            return Ok(());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let created: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut units = JoinSet::new();

        for def in defs.iter().cloned() {
            let semaphore = semaphore.clone();
            let created = created.clone();
            let create_table = self.create_table.clone();
            let cancel = cancel.clone();

            units.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return UnitOutcome::Skipped,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(p) => p,
                        Err(_) => return UnitOutcome::Skipped,
                    },
                };
                if cancel.is_cancelled() {
                    return UnitOutcome::Skipped;
                }
                match create_table.create_table_structure(&def).await {
                    Ok(()) => {
                        created.lock().await.push(def.table_name.clone());
                        UnitOutcome::Created
                    }
                    Err(e) => {
                        warn!(table = %def.table_name, error = %e, "batch unit failed");
                        UnitOutcome::Failed(e)
                    }
                }
            });
        }

        let mut first_error: Option<SchemaError> = None;
        let mut skipped = 0usize;
        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(UnitOutcome::Created) => {}
                Ok(UnitOutcome::Skipped) => skipped += 1,
                Ok(UnitOutcome::Failed(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(SchemaError::execution("CREATE TABLE", e));
                }
            }
        }

        let created = std::mem::take(&mut *created.lock().await);

        if let Some(err) = first_error {
            self.compensate(&created).await;
            return Err(err);
        }

        if cancel.is_cancelled() {
            info!(
                created = created.len(),
                skipped, "batch cancelled, leaving created tables for the next probe"
            );
            return Err(SchemaError::Cancelled);
        }

        if let Err(e) = self.create_table.add_foreign_keys(defs).await {
            warn!(error = %e, "foreign key phase failed");
            self.compensate(&created).await;
            return Err(e);
        }

        if let Err(e) = self.registrar.register_tables(defs).await {
            warn!(error = %e, "table registry batch insert failed");
            self.compensate(&created).await;
            return Err(e);
        }

        info!(tables = created.len(), "batch table creation completed");
        Ok(())
    }

    /// 作成済みテーブルを削除する。他のテーブルから参照されていて削除できなかったものは、
    /// 削除が進まなくなるまで繰り返し試みる。
    async fn compensate(&self, created: &[String]) {
        let mut pending: Vec<&String> = created.iter().collect();
        let mut dropped = 0usize;
        while !pending.is_empty() {
            let mut failed = Vec::new();
            for table in pending.iter().copied() {
                match self.drop_table.execute(table).await {
                    Ok(()) => dropped += 1,
                    Err(e) => failed.push((table, e)),
                }
            }
            if failed.len() == pending.len() {
                for (table, e) in &failed {
                    warn!(table = %table, error = %e, "failed to drop table during batch compensation");
                }
                break;
            }
            pending = failed.into_iter().map(|(table, _)| table).collect();
        }
        info!(
            dropped,
            total = created.len(),
            "batch compensation finished"
        );
    }
}
