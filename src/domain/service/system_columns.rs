//! 全オブジェクトに共通する標準カラムと、そのフィールドメタデータ。

use crate::domain::entity::{ColumnDefinition, FieldMetadata, TableDefinition};
use crate::domain::service::id_generator;
use crate::domain::value_object::FieldType;

/// 監査系 Lookup の参照先。
pub const SYSTEM_USER_TABLE: &str = "_System_User";

const SYSTEM_COLUMN_NAMES: [&str; 7] = [
    "id",
    "created_date",
    "last_modified_date",
    "created_by_id",
    "last_modified_by_id",
    "owner_id",
    "is_deleted",
];

/// システムが管理するカラムかどうか。`name` はユーザーが編集するため含めない。
pub fn is_system_column(name: &str) -> bool {
    SYSTEM_COLUMN_NAMES.contains(&name)
}

/// 全テーブルに付与する標準カラム。
pub fn get_standard_system_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "VARCHAR(36)").with_primary_key(),
        ColumnDefinition::new("name", "VARCHAR(255)").not_null(),
        ColumnDefinition::new("owner_id", "VARCHAR(36)"),
        ColumnDefinition::new("created_date", "TIMESTAMPTZ").with_default("CURRENT_TIMESTAMP"),
        ColumnDefinition::new("last_modified_date", "TIMESTAMPTZ")
            .with_default("CURRENT_TIMESTAMP"),
        ColumnDefinition::new("created_by_id", "VARCHAR(36)"),
        ColumnDefinition::new("last_modified_by_id", "VARCHAR(36)"),
        ColumnDefinition::new("is_deleted", "BOOLEAN")
            .not_null()
            .with_default("FALSE"),
    ]
}

/// 標準カラムのうち定義に無いものを先頭に補う。既存カラムの順序は保つ。
pub fn enrich_with_system_columns(mut def: TableDefinition) -> TableDefinition {
    let missing: Vec<ColumnDefinition> = get_standard_system_columns()
        .into_iter()
        .filter(|std_col| def.column(&std_col.name).is_none())
        .collect();
    if !missing.is_empty() {
        let mut columns = missing;
        columns.append(&mut def.columns);
        def.columns = columns;
    }
    def
}

fn standard_field(
    object_id: &str,
    object_api_name: &str,
    api_name: &str,
    label: &str,
    field_type: FieldType,
) -> FieldMetadata {
    FieldMetadata {
        id: id_generator::field_id(object_api_name, api_name),
        object_id: object_id.to_string(),
        api_name: api_name.to_string(),
        label: label.to_string(),
        field_type,
        required: false,
        is_unique: false,
        is_system: is_system_column(api_name),
        is_name_field: false,
        default_value: None,
        help_text: None,
        options: Vec::new(),
        min_length: None,
        max_length: None,
        reference_to: Vec::new(),
        is_polymorphic: false,
        is_master_detail: false,
        delete_rule: None,
        relationship_name: None,
        formula: None,
        return_type: None,
        rollup_config: None,
    }
}

fn user_lookup(
    object_id: &str,
    object_api_name: &str,
    api_name: &str,
    label: &str,
) -> FieldMetadata {
    let mut field = standard_field(
        object_id,
        object_api_name,
        api_name,
        label,
        FieldType::Lookup,
    );
    field.reference_to = vec![SYSTEM_USER_TABLE.to_string()];
    field
}

/// 標準カラムに対応するフィールドメタデータ。is_deleted は内部用のため登録しない。
pub fn get_standard_field_metadata(object_id: &str, object_api_name: &str) -> Vec<FieldMetadata> {
    let mut id = standard_field(object_id, object_api_name, "id", "ID", FieldType::Text);
    id.is_unique = true;

    let mut name = standard_field(object_id, object_api_name, "name", "Name", FieldType::Text);
    name.required = true;
    name.is_name_field = true;

    vec![
        id,
        name,
        user_lookup(object_id, object_api_name, "owner_id", "Owner"),
        user_lookup(object_id, object_api_name, "created_by_id", "Created By"),
        user_lookup(
            object_id,
            object_api_name,
            "last_modified_by_id",
            "Last Modified By",
        ),
        standard_field(
            object_id,
            object_api_name,
            "created_date",
            "Created Date",
            FieldType::DateTime,
        ),
        standard_field(
            object_id,
            object_api_name,
            "last_modified_date",
            "Last Modified Date",
            FieldType::DateTime,
        ),
    ]
}
