pub mod ddl_executor;
pub mod metadata_registrar;
pub mod schema_catalog;

pub use ddl_executor::DdlExecutor;
pub use metadata_registrar::MetadataRegistrar;
pub use schema_catalog::SchemaCatalog;
