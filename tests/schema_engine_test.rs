//! スキーマ進化エンジンの統合テスト（インメモリ DB 使用）
//!
//! 物理スキーマとレジストリを同じ状態で模擬し、クラッシュ後の再実行や補償の結果を
//! カタログの再確認で検証する。

use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use k1s0_schema_engine::domain::entity::{
    ColumnDefinition, ColumnState, DdlOperation, ForeignKeyDefinition, IndexDefinition,
    ObjectMetadata, TableDefinition,
};
use k1s0_schema_engine::domain::error::SchemaError;
use k1s0_schema_engine::domain::repository::{DdlExecutor, MetadataRegistrar, SchemaCatalog};
use k1s0_schema_engine::domain::service::{
    ddl_builder, field_mapper, id_generator, system_columns,
};
use k1s0_schema_engine::domain::value_object::FieldType;
use k1s0_schema_engine::test_support::{RegistryFault, TestEngine};

fn invoice_def() -> TableDefinition {
    TableDefinition::new(
        "invoice",
        vec![
            ColumnDefinition::new("id", "VARCHAR(36)").with_primary_key(),
            ColumnDefinition::new("name", "VARCHAR(255)").not_null(),
            ColumnDefinition::logical("total", FieldType::Number),
        ],
    )
}

fn invoice_object() -> ObjectMetadata {
    ObjectMetadata::new("invoice", "Invoice", "Invoices")
}

async fn create_invoice(engine: &TestEngine) {
    engine
        .create_table
        .create_table_with_strict_metadata(&invoice_def(), &invoice_object())
        .await
        .unwrap();
}

fn simple_table(name: &str) -> TableDefinition {
    system_columns::enrich_with_system_columns(TableDefinition::new(
        name,
        vec![ColumnDefinition::logical("amount", FieldType::Currency)],
    ))
}

/// `{target}_id` で target を参照するテーブル。
fn referencing_table(name: &str, target: &str) -> TableDefinition {
    let column = format!("{target}_id");
    let mut def = simple_table(name);
    def.columns.push(
        ColumnDefinition::logical(column.clone(), FieldType::Lookup).with_reference_to(&[target]),
    );
    def.with_foreign_key(ForeignKeyDefinition {
        column,
        references: format!("{target}(id)"),
        on_delete: Some("SET NULL".to_string()),
        on_update: None,
    })
}

#[tokio::test]
async fn test_invoice_add_due_date_scenario() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine.db.clear_statements().await;

    let due_date = ColumnDefinition::logical("due_date", FieldType::Date);
    let state = engine
        .columns
        .add_column("invoice", &due_date)
        .await
        .unwrap();
    assert_eq!(state, ColumnState::Absent);

    let statements = engine.db.statements().await;
    let alters: Vec<_> = statements
        .iter()
        .filter(|s| {
            matches!(&s.operation, DdlOperation::AddColumn { column, .. } if column == "due_date")
        })
        .collect();
    assert_eq!(alters.len(), 1);
    assert!(alters[0]
        .sql
        .starts_with("ALTER TABLE \"invoice\" ADD COLUMN \"due_date\""));
    assert_eq!(statements.iter().filter(|s| s.is_foreign_key()).count(), 0);

    let fields = engine.db.fields_of("invoice").await;
    let new_fields: Vec<_> = fields.iter().filter(|f| f.api_name == "due_date").collect();
    assert_eq!(new_fields.len(), 1);
    assert_eq!(new_fields[0].field_type, FieldType::Date);
    assert!(!new_fields[0].required);
    assert_eq!(new_fields[0].object_id, invoice_object().id);
}

#[tokio::test]
async fn test_add_column_replay_is_idempotent() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine.db.clear_statements().await;

    let col = ColumnDefinition::logical("due_date", FieldType::Date);
    let first = engine.columns.add_column("invoice", &col).await.unwrap();
    let second = engine.columns.add_column("invoice", &col).await.unwrap();

    assert_eq!(first, ColumnState::Absent);
    assert_eq!(second, ColumnState::Synced);
    assert_eq!(engine.db.statements().await.len(), 1);

    let due_dates = engine
        .db
        .fields_of("invoice")
        .await
        .into_iter()
        .filter(|f| f.api_name == "due_date")
        .count();
    assert_eq!(due_dates, 1);
}

#[tokio::test]
async fn test_replay_after_metadata_crash_adopts_orphan() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    // 前回の実行が DDL 成功後・登録前に停止した状態
    engine.db.seed_physical_column("invoice", "due_date").await;
    engine.db.clear_statements().await;

    let col = ColumnDefinition::logical("due_date", FieldType::Date);
    let state = engine.columns.add_column("invoice", &col).await.unwrap();

    assert_eq!(state, ColumnState::Orphan);
    assert!(engine.db.statements().await.is_empty());
    assert_eq!(
        engine.columns.probe("invoice", "due_date").await.unwrap(),
        ColumnState::Synced
    );
}

#[tokio::test]
async fn test_orphan_adoption_never_drops_column() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine
        .db
        .seed_physical_column("invoice", "legacy_code")
        .await;
    engine.db.fail_registry(RegistryFault::UpsertField).await;
    engine.db.clear_statements().await;

    let col = ColumnDefinition::logical("legacy_code", FieldType::Text);
    let err = engine
        .columns
        .add_column("invoice", &col)
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::Database { .. }));
    assert!(!engine
        .db
        .statements()
        .await
        .iter()
        .any(|s| s.is_drop_column()));
    assert!(engine
        .db
        .column_exists("invoice", "legacy_code")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_failed_registration_drops_new_column() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine.db.fail_registry(RegistryFault::UpsertField).await;

    let col = ColumnDefinition::logical("due_date", FieldType::Date);
    let err = engine
        .columns
        .add_column("invoice", &col)
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::Database { .. }));
    assert!(!engine
        .db
        .column_exists("invoice", "due_date")
        .await
        .unwrap());
    assert_eq!(
        engine.columns.probe("invoice", "due_date").await.unwrap(),
        ColumnState::Absent
    );
}

#[tokio::test]
async fn test_failed_compensating_drop_is_critical() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine.db.fail_registry(RegistryFault::UpsertField).await;
    engine.db.fail_ddl_containing("DROP COLUMN").await;

    let col = ColumnDefinition::logical("due_date", FieldType::Date);
    let err = engine
        .columns
        .add_column("invoice", &col)
        .await
        .unwrap_err();

    assert!(err.is_critical());
    let SchemaError::CriticalInconsistency {
        original,
        compensation,
    } = err
    else {
        panic!("expected critical inconsistency");
    };
    assert!(matches!(*original, SchemaError::Database { .. }));
    assert!(matches!(*compensation, SchemaError::Execution { .. }));
    assert_eq!(
        engine.columns.probe("invoice", "due_date").await.unwrap(),
        ColumnState::Orphan
    );
}

#[tokio::test]
async fn test_ghost_cleanup_never_touches_physical_schema() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    let ghost = field_mapper::prepare_field(
        &invoice_object().id,
        "invoice",
        &ColumnDefinition::logical("discount", FieldType::Percent),
    );
    engine.db.seed_field(ghost).await;
    engine.db.clear_statements().await;

    let state = engine
        .columns
        .drop_column("invoice", "discount")
        .await
        .unwrap();

    assert_eq!(state, ColumnState::Ghost);
    assert!(engine.db.statements().await.is_empty());
    assert!(!engine.db.field_exists("invoice", "discount").await.unwrap());
    assert_eq!(
        engine.db.list_columns("invoice").await.unwrap(),
        vec!["id", "name", "total"]
    );
}

#[tokio::test]
async fn test_drop_synced_column_removes_both_sides() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;

    let state = engine
        .columns
        .drop_column("invoice", "total")
        .await
        .unwrap();

    assert_eq!(state, ColumnState::Synced);
    assert_eq!(
        engine.columns.probe("invoice", "total").await.unwrap(),
        ColumnState::Absent
    );
}

#[tokio::test]
async fn test_field_registered_under_generated_id_is_found() {
    let engine = TestEngine::new();
    engine.db.seed_physical_table("orphan_table", &["id"]).await;

    let col = ColumnDefinition::logical("note", FieldType::Text);
    engine
        .columns
        .add_column("orphan_table", &col)
        .await
        .unwrap();

    let fields = engine.db.fields_of("orphan_table").await;
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].object_id, id_generator::object_id("orphan_table"));
    assert_eq!(
        engine.columns.probe("orphan_table", "note").await.unwrap(),
        ColumnState::Synced
    );
}

#[tokio::test]
async fn test_lookup_column_replay_keeps_single_constraint() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine
        .db
        .seed_physical_table("account", &["id", "name"])
        .await;
    engine.db.clear_statements().await;

    let col =
        ColumnDefinition::logical("account_id", FieldType::Lookup).with_reference_to(&["account"]);
    assert_eq!(
        engine.columns.add_column("invoice", &col).await.unwrap(),
        ColumnState::Absent
    );
    assert_eq!(
        engine.columns.add_column("invoice", &col).await.unwrap(),
        ColumnState::Synced
    );

    let adds = engine
        .db
        .statements()
        .await
        .into_iter()
        .filter(|s| matches!(s.operation, DdlOperation::AddColumn { .. }))
        .count();
    assert_eq!(adds, 1);
    assert!(engine.db.has_constraint("fk_invoice_account_id").await);
}

#[tokio::test]
async fn test_replay_after_crash_before_constraint_adds_foreign_key() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine
        .db
        .seed_physical_table("account", &["id", "name"])
        .await;
    // 前回の実行が ADD COLUMN 後・制約追加前に停止した状態
    engine
        .db
        .seed_physical_column("invoice", "account_id")
        .await;
    engine.db.clear_statements().await;

    let col =
        ColumnDefinition::logical("account_id", FieldType::Lookup).with_reference_to(&["account"]);
    let state = engine.columns.add_column("invoice", &col).await.unwrap();

    assert_eq!(state, ColumnState::Orphan);
    let statements = engine.db.statements().await;
    assert_eq!(statements.len(), 1);
    assert!(statements[0].is_foreign_key());
    assert!(engine.db.has_constraint("fk_invoice_account_id").await);
    assert_eq!(
        engine.columns.probe("invoice", "account_id").await.unwrap(),
        ColumnState::Synced
    );
}

#[tokio::test]
async fn test_ensure_column_reports_creation() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;

    let col = ColumnDefinition::logical("due_date", FieldType::Date);
    assert!(assert_ok!(
        engine.columns.ensure_column("invoice", &col).await
    ));
    assert!(!assert_ok!(
        engine.columns.ensure_column("invoice", &col).await
    ));
}

#[tokio::test]
async fn test_modify_column_reports_stale_metadata() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    engine.db.fail_registry(RegistryFault::UpsertField).await;
    engine.db.clear_statements().await;

    let widened = ColumnDefinition::logical("total", FieldType::Currency);
    let err = engine
        .columns
        .modify_column("invoice", &widened)
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::MetadataStale { ref column, .. } if column == "total"));
    let statements = engine.db.statements().await;
    assert_eq!(statements.len(), 1);
    assert!(matches!(
        statements[0].operation,
        DdlOperation::AlterColumnType { .. }
    ));
    assert!(engine.db.column_exists("invoice", "total").await.unwrap());
}

#[tokio::test]
async fn test_modify_column_updates_field_type() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;

    let widened = ColumnDefinition::logical("total", FieldType::Currency);
    engine
        .columns
        .modify_column("invoice", &widened)
        .await
        .unwrap();

    let total = engine
        .db
        .fields_of("invoice")
        .await
        .into_iter()
        .find(|f| f.api_name == "total")
        .unwrap();
    assert_eq!(total.field_type, FieldType::Currency);
}

#[tokio::test]
async fn test_strict_create_duplicate_object_drops_table() {
    let engine = TestEngine::new();
    engine.db.upsert_object(&invoice_object()).await.unwrap();

    let err = engine
        .create_table
        .create_table_with_strict_metadata(&invoice_def(), &invoice_object())
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::DuplicateObject(ref name) if name == "invoice"));
    assert!(!engine.db.table_exists("invoice").await.unwrap());
    assert!(engine.registry.execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_strict_create_invalid_field_drops_table() {
    let engine = TestEngine::new();
    let mut def = invoice_def();
    def.columns
        .push(ColumnDefinition::logical("memo", FieldType::TextArea).with_label("x".repeat(300)));

    let err = engine
        .create_table
        .create_table_with_strict_metadata(&def, &invoice_object())
        .await
        .unwrap_err();

    assert_eq!(err.sqlstate(), Some("22001"));
    assert!(!engine.db.table_exists("invoice").await.unwrap());
    assert!(engine.db.object("invoice").await.is_none());
    assert!(engine.db.fields_of("invoice").await.is_empty());
}

#[tokio::test]
async fn test_strict_create_commit_failure_drops_table() {
    let engine = TestEngine::new();
    engine.db.fail_registry(RegistryFault::BundleCommit).await;

    let err = engine
        .create_table
        .create_table_with_strict_metadata(&invoice_def(), &invoice_object())
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::Database { .. }));
    assert!(!engine.db.table_exists("invoice").await.unwrap());
    assert!(engine.db.object("invoice").await.is_none());
}

#[tokio::test]
async fn test_strict_create_failed_drop_is_critical() {
    let engine = TestEngine::new();
    engine.db.fail_registry(RegistryFault::BundleCommit).await;
    engine.db.fail_ddl_containing("DROP TABLE").await;

    let err = engine
        .create_table
        .create_table_with_strict_metadata(&invoice_def(), &invoice_object())
        .await
        .unwrap_err();

    assert!(err.is_critical());
    assert!(engine.db.table_exists("invoice").await.unwrap());
}

#[tokio::test]
async fn test_strict_create_physical_failure_keeps_existing_table() {
    let engine = TestEngine::new();
    engine
        .db
        .seed_physical_table("invoice", &["id", "name", "total"])
        .await;
    engine.db.fail_ddl_containing("CREATE INDEX").await;
    let def = invoice_def().with_index(IndexDefinition::new(&["total"], false));

    let err = engine
        .create_table
        .create_table_with_strict_metadata(&def, &invoice_object())
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::Execution { .. }));
    assert!(!err.is_critical());
    let statements = engine.db.statements().await;
    assert!(!statements
        .iter()
        .any(|s| matches!(s.operation, DdlOperation::DropTable { .. })));
    assert!(engine.db.table_exists("invoice").await.unwrap());
    assert!(engine.db.object("invoice").await.is_none());
}

#[tokio::test]
async fn test_strict_create_rolls_back_table_when_index_fails() {
    let engine = TestEngine::new();
    engine.db.fail_ddl_containing("CREATE INDEX").await;
    let def = invoice_def().with_index(IndexDefinition::new(&["total"], false));

    assert_err!(
        engine
            .create_table
            .create_table_with_strict_metadata(&def, &invoice_object())
            .await
    );
    assert!(!engine.db.table_exists("invoice").await.unwrap());
}

#[tokio::test]
async fn test_strict_create_registers_everything() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;

    assert!(engine.db.table_exists("invoice").await.unwrap());
    let object = engine.db.object("invoice").await.unwrap();
    assert_eq!(object.id, invoice_object().id);
    let names: Vec<_> = engine
        .db
        .fields_of("invoice")
        .await
        .into_iter()
        .map(|f| f.api_name)
        .collect();
    assert_eq!(names, vec!["id", "name", "total"]);

    let registry = engine.registry.execute().await.unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry[0].table_name, "invoice");
    assert_eq!(registry[0].created_by, "bootstrap");
}

#[tokio::test]
async fn test_batch_failure_leaves_no_table_behind() {
    let engine = TestEngine::with_concurrency(2);
    let defs: Vec<_> = ["t1", "t2", "t3", "t4", "t5"]
        .into_iter()
        .map(simple_table)
        .collect();
    engine
        .db
        .fail_ddl_containing("CREATE TABLE IF NOT EXISTS \"t3\"")
        .await;

    let err = engine
        .batch_create
        .execute(&defs, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::Execution { .. }));
    for def in &defs {
        assert!(
            !engine.db.table_exists(&def.table_name).await.unwrap(),
            "{}",
            def.table_name
        );
    }
    assert!(engine.registry.execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_index_failure_leaves_no_table_behind() {
    let engine = TestEngine::with_concurrency(1);
    let defs: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| simple_table(name).with_index(IndexDefinition::new(&["id"], false)))
        .collect();
    engine
        .db
        .fail_ddl_containing("CREATE INDEX IF NOT EXISTS \"idx_b_id\"")
        .await;

    let err = engine
        .batch_create
        .execute(&defs, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, SchemaError::Execution { ref statement, .. } if statement.contains("idx_b_id"))
    );
    assert!(engine.db.list_tables().await.unwrap().is_empty());
    assert!(engine.registry.execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_with_mutual_references_succeeds() {
    // 参照先より先に参照元が作られる順序
    let engine = TestEngine::with_concurrency(1);
    let defs = vec![
        referencing_table("order_line", "order_head"),
        referencing_table("order_head", "order_line"),
    ];

    engine
        .batch_create
        .execute(&defs, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        engine.db.list_tables().await.unwrap(),
        vec!["order_head", "order_line"]
    );
    assert!(
        engine
            .db
            .has_constraint("fk_order_line_order_head_id")
            .await
    );
    assert!(
        engine
            .db
            .has_constraint("fk_order_head_order_line_id")
            .await
    );
    let creates: Vec<_> = engine
        .db
        .statements()
        .await
        .into_iter()
        .filter(|s| matches!(s.operation, DdlOperation::CreateTable { .. }))
        .collect();
    assert!(creates.iter().all(|s| !s.sql.contains("FOREIGN KEY")));
}

#[tokio::test]
async fn test_batch_reference_to_missing_table_rolls_back() {
    let engine = TestEngine::new();
    let defs = vec![simple_table("r1"), referencing_table("r2", "nowhere")];

    let err = engine
        .batch_create
        .execute(&defs, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.sqlstate(), Some("42P01"));
    assert!(engine.db.list_tables().await.unwrap().is_empty());
    assert!(!engine.db.has_constraint("fk_r2_nowhere_id").await);
    assert!(engine.registry.execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_registration_failure_drops_referenced_tables() {
    let engine = TestEngine::with_concurrency(1);
    let defs = vec![simple_table("parent"), referencing_table("child", "parent")];
    engine.db.fail_registry(RegistryFault::RegisterTables).await;

    assert_err!(
        engine
            .batch_create
            .execute(&defs, &CancellationToken::new())
            .await
    );
    assert!(engine.db.list_tables().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_registration_failure_leaves_no_table_behind() {
    let engine = TestEngine::new();
    let defs: Vec<_> = ["t1", "t2", "t3"].into_iter().map(simple_table).collect();
    engine.db.fail_registry(RegistryFault::RegisterTables).await;

    assert_err!(
        engine
            .batch_create
            .execute(&defs, &CancellationToken::new())
            .await
    );
    assert!(engine.db.list_tables().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_batch_success_registers_every_table() {
    let engine = TestEngine::with_concurrency(3);
    let defs: Vec<_> = ["a1", "a2", "a3", "a4"]
        .into_iter()
        .map(simple_table)
        .collect();

    engine
        .batch_create
        .execute(&defs, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        engine.db.list_tables().await.unwrap(),
        vec!["a1", "a2", "a3", "a4"]
    );
    let health = engine.validate.validate_schema_registry().await.unwrap();
    assert!(health.is_healthy());
    assert_eq!(health.expected_count, 4);
}

#[tokio::test]
async fn test_cancelled_batch_creates_nothing() {
    let engine = TestEngine::new();
    let defs: Vec<_> = ["c1", "c2"].into_iter().map(simple_table).collect();
    let token = CancellationToken::new();
    token.cancel();

    let err = engine
        .batch_create
        .execute(&defs, &token)
        .await
        .unwrap_err();

    assert!(matches!(err, SchemaError::Cancelled));
    assert!(engine.db.statements().await.is_empty());
}

#[tokio::test]
async fn test_registry_health_reports_missing_table() {
    let engine = TestEngine::new();
    let defs: Vec<_> = ["h1", "h2"].into_iter().map(simple_table).collect();
    engine
        .batch_create
        .execute(&defs, &CancellationToken::new())
        .await
        .unwrap();
    engine
        .db
        .execute(&ddl_builder::build_drop_table("h2"))
        .await
        .unwrap();

    let health = engine.validate.validate_schema_registry().await.unwrap();

    assert!(!health.is_healthy());
    assert_eq!(health.status, "unhealthy");
    assert_eq!(health.missing_tables, vec!["h2"]);
}

#[tokio::test]
async fn test_schema_drift_reports_ghosts_only() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;
    let ghost = field_mapper::prepare_field(
        &invoice_object().id,
        "invoice",
        &ColumnDefinition::logical("discount", FieldType::Percent),
    );
    engine.db.seed_field(ghost).await;
    engine
        .db
        .seed_physical_column("invoice", "unregistered")
        .await;

    let drift = engine.validate.validate_schema("invoice").await.unwrap();

    assert!(drift.has_drift());
    assert_eq!(drift.missing_columns, vec!["discount"]);
}

#[tokio::test]
async fn test_drop_table_clears_registry() {
    let engine = TestEngine::new();
    create_invoice(&engine).await;

    engine.drop_table.execute("invoice").await.unwrap();

    assert!(!engine.db.table_exists("invoice").await.unwrap());
    assert!(engine.db.object("invoice").await.is_none());
    assert!(engine.db.fields_of("invoice").await.is_empty());
    assert!(engine.registry.execute().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_names_are_rejected_before_ddl() {
    let engine = TestEngine::new();

    let bad_table =
        TableDefinition::new("Foo-Bar", vec![ColumnDefinition::new("id", "VARCHAR(36)")]);
    let err = engine
        .create_table
        .create_physical_table(&bad_table)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let empty_picklist = ColumnDefinition::logical("stage", FieldType::Picklist);
    let err = engine
        .columns
        .add_column("invoice", &empty_picklist)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert!(engine.db.statements().await.is_empty());
}
