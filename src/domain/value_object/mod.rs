pub mod delete_rule;
pub mod field_type;
pub mod sharing_model;
pub mod table_type;

pub use delete_rule::DeleteRule;
pub use field_type::FieldType;
pub use sharing_model::SharingModel;
pub use table_type::TableType;
