pub mod ddl_builder;
pub mod field_mapper;
pub mod id_generator;
pub mod naming_validator;
pub mod system_columns;
pub mod type_mapper;
