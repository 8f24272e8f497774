//! カラム定義から `_System_Field` に登録する行を組み立てる。

use crate::domain::entity::{ColumnDefinition, FieldMetadata, ObjectMetadata};
use crate::domain::service::{ddl_builder, id_generator, system_columns, type_mapper};

/// snake_case の名前を Title Case のラベルにする。
pub fn default_label(api_name: &str) -> String {
    api_name
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// カラム1つ分のフィールドメタデータを組み立てる。
pub fn prepare_field(
    object_id: &str,
    object_api_name: &str,
    col: &ColumnDefinition,
) -> FieldMetadata {
    let is_system = system_columns::is_system_column(&col.name);
    let field_type = col
        .effective_logical_type()
        .unwrap_or_else(|| type_mapper::map_sql_type_to_logical(&ddl_builder::native_type(col)));

    FieldMetadata {
        id: id_generator::field_id(object_api_name, &col.name),
        object_id: object_id.to_string(),
        api_name: col.name.clone(),
        label: col
            .label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| default_label(&col.name)),
        field_type,
        required: !col.nullable && !is_system,
        is_unique: col.unique,
        is_system,
        is_name_field: col.is_name_field || col.name.eq_ignore_ascii_case("name"),
        default_value: col.default_value.clone(),
        help_text: col.help_text.clone(),
        options: col.options.clone(),
        min_length: col.min_length,
        max_length: col.max_length,
        reference_to: col.reference_to.clone(),
        is_polymorphic: col.is_polymorphic(),
        is_master_detail: col.is_master_detail,
        delete_rule: col.on_delete,
        relationship_name: col.relationship_name.clone(),
        formula: col.formula.clone(),
        return_type: col.return_type,
        rollup_config: None,
    }
}

/// テーブルの全カラム分のフィールドを組み立てる。
/// 標準カラムは標準メタデータ（ラベル、参照先）を優先する。
pub fn prepare_fields(object: &ObjectMetadata, columns: &[ColumnDefinition]) -> Vec<FieldMetadata> {
    let object_id = object.resolved_id();
    let standard = system_columns::get_standard_field_metadata(&object_id, &object.api_name);

    columns
        .iter()
        .filter(|col| col.name != "is_deleted")
        .map(|col| {
            standard
                .iter()
                .find(|f| f.api_name == col.name)
                .cloned()
                .unwrap_or_else(|| prepare_field(&object_id, &object.api_name, col))
        })
        .collect()
}
