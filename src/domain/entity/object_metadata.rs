use serde::{Deserialize, Serialize};

use crate::domain::service::id_generator;
use crate::domain::value_object::{SharingModel, TableType};

/// ObjectMetadata は `_System_Object` の1行。物理テーブル1つに対応する。
/// id は api_name から独立しており、api_name を変更してもフィールドカタログの参照は壊れない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    #[serde(default)]
    pub id: String,
    pub api_name: String,
    pub label: String,
    pub plural_label: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub sharing_model: SharingModel,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub path_field: Option<String>,
    #[serde(default)]
    pub list_fields: Vec<String>,
    #[serde(default)]
    pub theme_color: Option<String>,
}

impl ObjectMetadata {
    /// カスタムオブジェクトのメタデータを作成する。id は api_name から決定的に生成する。
    pub fn new(
        api_name: impl Into<String>,
        label: impl Into<String>,
        plural_label: impl Into<String>,
    ) -> Self {
        let api_name = api_name.into();
        Self {
            id: id_generator::object_id(&api_name),
            api_name,
            label: label.into(),
            plural_label: plural_label.into(),
            icon: None,
            description: None,
            is_custom: true,
            sharing_model: SharingModel::default(),
            app_id: None,
            path_field: None,
            list_fields: Vec::new(),
            theme_color: None,
        }
    }

    /// 空の id を生成 id で補った値を返す。
    pub fn resolved_id(&self) -> String {
        if self.id.is_empty() {
            id_generator::object_id(&self.api_name)
        } else {
            self.id.clone()
        }
    }

    /// カスタムなら custom_object、そうでなければ system_metadata。
    pub fn table_type(&self) -> TableType {
        if self.is_custom {
            TableType::CustomObject
        } else {
            TableType::SystemMetadata
        }
    }
}
