//! テスト用インメモリのスキーマカタログ・DDL 実行器・メタデータレジストリと、
//! ユースケース一式を組み立てるヘルパー。
//! 統合テスト（tests/schema_engine_test.rs）から利用する。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::table_registry::CREATED_BY_BOOTSTRAP;
use crate::domain::entity::{
    DdlOperation, DdlStatement, FieldMetadata, ObjectMetadata, TableDefinition, TableRegistryItem,
};
use crate::domain::error::SchemaError;
use crate::domain::repository::{DdlExecutor, MetadataRegistrar, SchemaCatalog};
use crate::domain::service::id_generator;
use crate::usecase::batch_create_tables::DEFAULT_BATCH_CONCURRENCY;
use crate::usecase::{
    BatchCreateTablesUseCase, CreateTableUseCase, DropTableUseCase, GetTableRegistryUseCase,
    ManageColumnsUseCase, ValidateSchemaUseCase,
};

/// レジストリの VARCHAR(255) 列の上限。
const MAX_REGISTRY_TEXT: usize = 255;

/// 失敗させるレジストリ操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryFault {
    RegisterTables,
    UpsertField,
    DeleteField,
    /// register_table_bundle の確定時に失敗させる。
    BundleCommit,
}

#[derive(Default)]
struct Faults {
    ddl_fragments: Vec<String>,
    registry: HashSet<RegistryFault>,
}

/// 外部キー制約の所有テーブルと参照先。
#[derive(Debug, Clone)]
struct ForeignKeyRef {
    table: String,
    references: String,
}

#[derive(Debug, Clone, Default)]
struct SimulatedState {
    tables: BTreeMap<String, Vec<String>>,
    constraints: BTreeMap<String, ForeignKeyRef>,
    statements: Vec<DdlStatement>,
    table_registry: BTreeMap<String, TableRegistryItem>,
    objects: BTreeMap<String, ObjectMetadata>,
    fields: Vec<FieldMetadata>,
}

fn ddl_error(
    statement: &DdlStatement,
    message: impl std::fmt::Display,
    sqlstate: &str,
) -> SchemaError {
    SchemaError::execution(statement.sql.clone(), message).with_sqlstate(sqlstate)
}

impl SimulatedState {
    fn apply(&mut self, statement: &DdlStatement) -> Result<(), SchemaError> {
        match &statement.operation {
            DdlOperation::CreateTable { table, columns } => {
                self.tables
                    .entry(table.clone())
                    .or_insert_with(|| columns.clone());
            }
            DdlOperation::CreateIndex { table, .. } => {
                self.require_table(statement, table)?;
            }
            DdlOperation::AddColumn { table, column } => {
                let columns = self.require_table(statement, table)?;
                if columns.contains(column) {
                    return Err(ddl_error(
                        statement,
                        format!("column \"{column}\" of relation \"{table}\" already exists"),
                        "42701",
                    ));
                }
                columns.push(column.clone());
            }
            DdlOperation::AlterColumnType { table, column } => {
                let columns = self.require_table(statement, table)?;
                if !columns.contains(column) {
                    return Err(ddl_error(
                        statement,
                        format!("column \"{column}\" of relation \"{table}\" does not exist"),
                        "42703",
                    ));
                }
            }
            DdlOperation::DropColumn { table, column } => {
                let columns = self.require_table(statement, table)?;
                let Some(pos) = columns.iter().position(|c| c == column) else {
                    return Err(ddl_error(
                        statement,
                        format!("column \"{column}\" of relation \"{table}\" does not exist"),
                        "42703",
                    ));
                };
                columns.remove(pos);
            }
            DdlOperation::AddForeignKey {
                table,
                constraint,
                references,
            } => {
                self.require_table(statement, table)?;
                self.require_table(statement, references)?;
                if self.constraints.contains_key(constraint) {
                    return Err(ddl_error(
                        statement,
                        format!(
                            "constraint \"{constraint}\" for relation \"{table}\" already exists"
                        ),
                        "42710",
                    ));
                }
                self.constraints.insert(
                    constraint.clone(),
                    ForeignKeyRef {
                        table: table.clone(),
                        references: references.clone(),
                    },
                );
            }
            DdlOperation::DropTable { table } => {
                if let Some((name, fk)) = self
                    .constraints
                    .iter()
                    .find(|(_, fk)| fk.references == *table && fk.table != *table)
                {
                    return Err(ddl_error(
                        statement,
                        format!(
                            "cannot drop table {table} because constraint {name} on table {} depends on it",
                            fk.table
                        ),
                        "2BP01",
                    ));
                }
                self.tables.remove(table);
                self.constraints.retain(|_, fk| fk.table != *table);
            }
        }
        Ok(())
    }

    fn require_table(
        &mut self,
        statement: &DdlStatement,
        table: &str,
    ) -> Result<&mut Vec<String>, SchemaError> {
        self.tables.get_mut(table).ok_or_else(|| {
            ddl_error(
                statement,
                format!("relation \"{table}\" does not exist"),
                "42P01",
            )
        })
    }

    fn object_id_for(&self, table: &str) -> String {
        self.objects
            .get(table)
            .map_or_else(|| id_generator::object_id(table), |o| o.id.clone())
    }

    fn owner_ids(&self, table: &str) -> [String; 2] {
        [self.object_id_for(table), id_generator::object_id(table)]
    }

    fn register_table(&mut self, def: &TableDefinition) {
        let now = Utc::now();
        self.table_registry
            .entry(def.table_name.clone())
            .and_modify(|item| item.last_modified_date = now)
            .or_insert_with(|| TableRegistryItem {
                id: id_generator::table_id(&def.table_name),
                table_name: def.table_name.clone(),
                table_type: def.table_type.as_str().to_string(),
                category: Some(def.category.clone()),
                description: def.description.clone(),
                is_managed: def.is_managed,
                schema_version: Some(def.schema_version.clone()),
                created_by: CREATED_BY_BOOTSTRAP.to_string(),
                created_date: now,
                last_modified_date: now,
            });
    }

    fn upsert_object(&mut self, object: &ObjectMetadata) {
        let mut object = object.clone();
        object.id = match self.objects.get(&object.api_name) {
            Some(existing) => existing.id.clone(),
            None => object.resolved_id(),
        };
        self.objects.insert(object.api_name.clone(), object);
    }

    fn insert_object_strict(&mut self, object: &ObjectMetadata) -> Result<(), SchemaError> {
        if self.objects.contains_key(&object.api_name) {
            return Err(SchemaError::DuplicateObject(object.api_name.clone()));
        }
        let mut object = object.clone();
        object.id = object.resolved_id();
        self.objects.insert(object.api_name.clone(), object);
        Ok(())
    }

    fn upsert_field(&mut self, field: &FieldMetadata) -> Result<(), SchemaError> {
        for (column, value) in [("api_name", &field.api_name), ("label", &field.label)] {
            if value.chars().count() > MAX_REGISTRY_TEXT {
                return Err(SchemaError::database(format!(
                    "value too long for type character varying(255) in column \"{column}\""
                ))
                .with_sqlstate("22001"));
            }
        }
        match self
            .fields
            .iter_mut()
            .find(|f| f.object_id == field.object_id && f.api_name == field.api_name)
        {
            Some(existing) => {
                let id = existing.id.clone();
                *existing = field.clone();
                existing.id = id;
            }
            None => self.fields.push(field.clone()),
        }
        Ok(())
    }
}

/// InMemorySchemaDatabase は物理スキーマとレジストリを1つのメモリ上の状態で模擬する。
/// 同じインスタンスを SchemaCatalog / DdlExecutor / MetadataRegistrar として共有する。
pub struct InMemorySchemaDatabase {
    state: RwLock<SimulatedState>,
    faults: RwLock<Faults>,
}

impl InMemorySchemaDatabase {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SimulatedState::default()),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// SQL に fragment を含む DDL を失敗させる。
    pub async fn fail_ddl_containing(&self, fragment: &str) {
        self.faults
            .write()
            .await
            .ddl_fragments
            .push(fragment.to_string());
    }

    pub async fn fail_registry(&self, fault: RegistryFault) {
        self.faults.write().await.registry.insert(fault);
    }

    pub async fn clear_faults(&self) {
        let mut faults = self.faults.write().await;
        faults.ddl_fragments.clear();
        faults.registry.clear();
    }

    /// 実行を試みた DDL 文（失敗したものを含む）。
    pub async fn statements(&self) -> Vec<DdlStatement> {
        self.state.read().await.statements.clone()
    }

    pub async fn clear_statements(&self) {
        self.state.write().await.statements.clear();
    }

    /// DDL を経由せずに物理テーブルを用意する。
    pub async fn seed_physical_table(&self, table: &str, columns: &[&str]) {
        self.state.write().await.tables.insert(
            table.to_string(),
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
    }

    /// DDL を経由せずに物理カラムを追加する（Orphan の再現用）。
    pub async fn seed_physical_column(&self, table: &str, column: &str) {
        self.state
            .write()
            .await
            .tables
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
    }

    /// DDL を経由せずにフィールド登録を追加する（Ghost の再現用）。
    pub async fn seed_field(&self, field: FieldMetadata) {
        self.state.write().await.fields.push(field);
    }

    /// 外部キー制約が存在するか。
    pub async fn has_constraint(&self, name: &str) -> bool {
        self.state.read().await.constraints.contains_key(name)
    }

    pub async fn object(&self, api_name: &str) -> Option<ObjectMetadata> {
        self.state.read().await.objects.get(api_name).cloned()
    }

    /// テーブルに属するフィールド登録を列名順で返す。
    pub async fn fields_of(&self, table: &str) -> Vec<FieldMetadata> {
        let state = self.state.read().await;
        let owners = state.owner_ids(table);
        let mut fields: Vec<_> = state
            .fields
            .iter()
            .filter(|f| owners.contains(&f.object_id))
            .cloned()
            .collect();
        fields.sort_by(|a, b| a.api_name.cmp(&b.api_name));
        fields
    }

    async fn ddl_fault(&self, statement: &DdlStatement) -> Option<SchemaError> {
        let faults = self.faults.read().await;
        faults
            .ddl_fragments
            .iter()
            .find(|fragment| statement.sql.contains(fragment.as_str()))
            .map(|fragment| {
                ddl_error(
                    statement,
                    format!("injected failure on '{fragment}'"),
                    "XX000",
                )
            })
    }

    async fn registry_fault(&self, fault: RegistryFault) -> Result<(), SchemaError> {
        if self.faults.read().await.registry.contains(&fault) {
            return Err(SchemaError::database(format!("injected {fault:?} failure")));
        }
        Ok(())
    }
}

impl Default for InMemorySchemaDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaCatalog for InMemorySchemaDatabase {
    async fn table_exists(&self, table_name: &str) -> Result<bool, SchemaError> {
        Ok(self.state.read().await.tables.contains_key(table_name))
    }

    async fn column_exists(
        &self,
        table_name: &str,
        column_name: &str,
    ) -> Result<bool, SchemaError> {
        Ok(self
            .state
            .read()
            .await
            .tables
            .get(table_name)
            .is_some_and(|columns| columns.iter().any(|c| c == column_name)))
    }

    async fn list_columns(&self, table_name: &str) -> Result<Vec<String>, SchemaError> {
        Ok(self
            .state
            .read()
            .await
            .tables
            .get(table_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self.state.read().await.tables.keys().cloned().collect())
    }
}

#[async_trait]
impl DdlExecutor for InMemorySchemaDatabase {
    async fn execute(&self, statement: &DdlStatement) -> Result<(), SchemaError> {
        let fault = self.ddl_fault(statement).await;
        let mut state = self.state.write().await;
        state.statements.push(statement.clone());
        if let Some(err) = fault {
            return Err(err);
        }
        state.apply(statement)
    }

    /// コピー上で全文を適用してから確定する。失敗時は実行を試みた文の記録だけを残す。
    async fn execute_table_ddl(&self, statements: &[DdlStatement]) -> Result<(), SchemaError> {
        let mut faults = Vec::with_capacity(statements.len());
        for statement in statements {
            faults.push(self.ddl_fault(statement).await);
        }

        let mut state = self.state.write().await;
        let mut staged = state.clone();
        let mut outcome = Ok(());
        for (statement, fault) in statements.iter().zip(faults) {
            staged.statements.push(statement.clone());
            let result = match fault {
                Some(err) => Err(err),
                None => staged.apply(statement),
            };
            match result {
                Ok(()) => {}
                Err(e) if statement.is_foreign_key() && e.is_duplicate_constraint() => {}
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        match outcome {
            Ok(()) => {
                *state = staged;
                Ok(())
            }
            Err(e) => {
                state.statements = staged.statements;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl MetadataRegistrar for InMemorySchemaDatabase {
    async fn upsert_object(&self, object: &ObjectMetadata) -> Result<(), SchemaError> {
        self.state.write().await.upsert_object(object);
        Ok(())
    }

    async fn insert_object_strict(&self, object: &ObjectMetadata) -> Result<(), SchemaError> {
        self.state.write().await.insert_object_strict(object)
    }

    async fn upsert_field_with_ids(&self, field: &FieldMetadata) -> Result<(), SchemaError> {
        self.registry_fault(RegistryFault::UpsertField).await?;
        self.state.write().await.upsert_field(field)
    }

    async fn batch_upsert_objects(&self, objects: &[ObjectMetadata]) -> Result<(), SchemaError> {
        let mut state = self.state.write().await;
        for object in objects {
            state.upsert_object(object);
        }
        Ok(())
    }

    async fn batch_upsert_fields(&self, fields: &[FieldMetadata]) -> Result<(), SchemaError> {
        self.registry_fault(RegistryFault::UpsertField).await?;
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        for field in fields {
            staged.upsert_field(field)?;
        }
        *state = staged;
        Ok(())
    }

    async fn register_tables(&self, tables: &[TableDefinition]) -> Result<(), SchemaError> {
        self.registry_fault(RegistryFault::RegisterTables).await?;
        let mut state = self.state.write().await;
        for def in tables {
            state.register_table(def);
        }
        Ok(())
    }

    async fn register_table_bundle(
        &self,
        table: &TableDefinition,
        object: &ObjectMetadata,
        fields: &[FieldMetadata],
    ) -> Result<(), SchemaError> {
        let mut state = self.state.write().await;
        let mut staged = state.clone();
        staged.register_table(table);
        staged.insert_object_strict(object)?;
        for field in fields {
            staged.upsert_field(field)?;
        }
        if self
            .faults
            .read()
            .await
            .registry
            .contains(&RegistryFault::BundleCommit)
        {
            return Err(SchemaError::database(
                "connection reset while committing transaction",
            ));
        }
        *state = staged;
        Ok(())
    }

    async fn find_object_id(&self, api_name: &str) -> Result<Option<String>, SchemaError> {
        Ok(self
            .state
            .read()
            .await
            .objects
            .get(api_name)
            .map(|o| o.id.clone()))
    }

    async fn field_exists(&self, table_name: &str, column_name: &str) -> Result<bool, SchemaError> {
        let state = self.state.read().await;
        let owners = state.owner_ids(table_name);
        Ok(state
            .fields
            .iter()
            .any(|f| f.api_name == column_name && owners.contains(&f.object_id)))
    }

    async fn expected_columns(&self, table_name: &str) -> Result<Vec<String>, SchemaError> {
        let state = self.state.read().await;
        let Some(object) = state.objects.get(table_name) else {
            return Ok(Vec::new());
        };
        let mut columns: Vec<_> = state
            .fields
            .iter()
            .filter(|f| f.object_id == object.id)
            .map(|f| f.api_name.clone())
            .collect();
        columns.sort();
        Ok(columns)
    }

    async fn managed_tables(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self
            .state
            .read()
            .await
            .table_registry
            .values()
            .filter(|item| item.is_managed)
            .map(|item| item.table_name.clone())
            .collect())
    }

    async fn table_registry(&self) -> Result<Vec<TableRegistryItem>, SchemaError> {
        Ok(self
            .state
            .read()
            .await
            .table_registry
            .values()
            .cloned()
            .collect())
    }

    async fn delete_field(&self, table_name: &str, column_name: &str) -> Result<(), SchemaError> {
        self.registry_fault(RegistryFault::DeleteField).await?;
        let mut state = self.state.write().await;
        let owners = state.owner_ids(table_name);
        state
            .fields
            .retain(|f| !(f.api_name == column_name && owners.contains(&f.object_id)));
        Ok(())
    }

    async fn unregister_table(&self, table_name: &str) {
        let mut state = self.state.write().await;
        let owners = state.owner_ids(table_name);
        state.table_registry.remove(table_name);
        state.fields.retain(|f| !owners.contains(&f.object_id));
        state.objects.remove(table_name);
    }
}

/// TestEngine はインメモリ DB に接続したユースケース一式。
pub struct TestEngine {
    pub db: Arc<InMemorySchemaDatabase>,
    pub create_table: Arc<CreateTableUseCase>,
    pub drop_table: Arc<DropTableUseCase>,
    pub batch_create: BatchCreateTablesUseCase,
    pub columns: ManageColumnsUseCase,
    pub validate: ValidateSchemaUseCase,
    pub registry: GetTableRegistryUseCase,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_BATCH_CONCURRENCY)
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        let db = Arc::new(InMemorySchemaDatabase::new());
        let catalog: Arc<dyn SchemaCatalog> = db.clone();
        let executor: Arc<dyn DdlExecutor> = db.clone();
        let registrar: Arc<dyn MetadataRegistrar> = db.clone();

        let create_table = Arc::new(CreateTableUseCase::new(executor.clone(), registrar.clone()));
        let drop_table = Arc::new(DropTableUseCase::new(executor.clone(), registrar.clone()));
        let batch_create = BatchCreateTablesUseCase::new(
            create_table.clone(),
            drop_table.clone(),
            registrar.clone(),
            concurrency,
        );

        Self {
            db,
            create_table,
            drop_table,
            batch_create,
            columns: ManageColumnsUseCase::new(catalog.clone(), executor, registrar.clone()),
            validate: ValidateSchemaUseCase::new(catalog, registrar.clone()),
            registry: GetTableRegistryUseCase::new(registrar),
        }
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
