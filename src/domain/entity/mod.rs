pub mod column_definition;
pub mod column_state;
pub mod ddl_statement;
pub mod field_metadata;
pub mod object_metadata;
pub mod schema_health;
pub mod table_definition;
pub mod table_registry;

pub use column_definition::ColumnDefinition;
pub use column_state::ColumnState;
pub use ddl_statement::{DdlOperation, DdlStatement};
pub use field_metadata::FieldMetadata;
pub use object_metadata::ObjectMetadata;
pub use schema_health::{SchemaDrift, SchemaHealth};
pub use table_definition::{ForeignKeyDefinition, IndexDefinition, TableDefinition};
pub use table_registry::TableRegistryItem;
