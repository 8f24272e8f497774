pub mod batch_create_tables;
pub mod create_table;
pub mod drop_table;
pub mod get_table_registry;
pub mod manage_columns;
pub mod validate_schema;

pub use batch_create_tables::BatchCreateTablesUseCase;
pub use create_table::CreateTableUseCase;
pub use drop_table::DropTableUseCase;
pub use get_table_registry::GetTableRegistryUseCase;
pub use manage_columns::ManageColumnsUseCase;
pub use validate_schema::ValidateSchemaUseCase;
