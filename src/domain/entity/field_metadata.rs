use serde::{Deserialize, Serialize};

use crate::domain::value_object::{DeleteRule, FieldType};

/// FieldMetadata は `_System_Field` の1行。物理カラム1つに対応する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub id: String,
    pub object_id: String,
    pub api_name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub is_unique: bool,
    pub is_system: bool,
    pub is_name_field: bool,
    pub default_value: Option<String>,
    pub help_text: Option<String>,
    pub options: Vec<String>,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub reference_to: Vec<String>,
    pub is_polymorphic: bool,
    pub is_master_detail: bool,
    pub delete_rule: Option<DeleteRule>,
    pub relationship_name: Option<String>,
    pub formula: Option<String>,
    pub return_type: Option<FieldType>,
    pub rollup_config: Option<serde_json::Value>,
}

impl FieldMetadata {
    /// 所属オブジェクトを差し替える。strict 作成で実際のオブジェクト id に紐付け直すときに使う。
    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = object_id.into();
        self
    }
}
