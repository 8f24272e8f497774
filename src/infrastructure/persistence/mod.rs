pub mod ddl_executor_impl;
pub mod metadata_registrar_impl;
pub mod schema_catalog_impl;
pub mod transaction_manager;

pub use ddl_executor_impl::DdlExecutorPostgres;
pub use metadata_registrar_impl::MetadataRegistrarPostgres;
pub use schema_catalog_impl::SchemaCatalogPostgres;
pub use transaction_manager::TransactionManager;
