use serde::{Deserialize, Serialize};

use crate::domain::entity::column_definition::ColumnDefinition;
use crate::domain::value_object::TableType;

/// IndexDefinition は CREATE TABLE と同時に作成するインデックス。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// 未指定なら `idx_{table}_{columns}` を使う。
    #[serde(default)]
    pub name: Option<String>,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(columns: &[&str], unique: bool) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique,
        }
    }
}

/// ForeignKeyDefinition はテーブル定義レベルの外部キー制約。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    pub column: String,
    /// `table(column)` 形式の参照先。
    pub references: String,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

/// TableDefinition は新しいオブジェクト型の物理テーブル定義。
/// 物理テーブル作成後は変更せず、以降の変更はカラム単位の操作で行う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub table_name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub indices: Vec<IndexDefinition>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    #[serde(default)]
    pub table_type: TableType,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_is_managed")]
    pub is_managed: bool,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_category() -> String {
    "custom".to_string()
}

fn default_is_managed() -> bool {
    true
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

impl TableDefinition {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            table_name: table_name.into(),
            label: None,
            columns,
            indices: Vec::new(),
            foreign_keys: Vec::new(),
            table_type: TableType::default(),
            category: default_category(),
            is_managed: default_is_managed(),
            schema_version: default_schema_version(),
            description: None,
        }
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indices.push(index);
        self
    }

    pub fn with_foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}
