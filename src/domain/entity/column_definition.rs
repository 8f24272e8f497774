use serde::{Deserialize, Serialize};

use crate::domain::value_object::{DeleteRule, FieldType};

/// ColumnDefinition は物理カラムと、そのレジストリ登録に必要な論理情報を表す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// ネイティブ型、または論理型名（型マッパーが解決する）。
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub logical_type: Option<FieldType>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// 参照先オブジェクト。先頭が外部キーの対象、2件以上でポリモーフィック。
    #[serde(default)]
    pub reference_to: Vec<String>,
    #[serde(default)]
    pub on_delete: Option<DeleteRule>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub return_type: Option<FieldType>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub is_master_detail: bool,
    #[serde(default)]
    pub is_name_field: bool,
    #[serde(default)]
    pub relationship_name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub min_length: Option<i32>,
    #[serde(default)]
    pub max_length: Option<i32>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDefinition {
    /// NULL 許容のカラム定義を作成する。
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            logical_type: None,
            nullable: true,
            default_value: None,
            unique: false,
            primary_key: false,
            auto_increment: false,
            reference_to: Vec::new(),
            on_delete: None,
            formula: None,
            return_type: None,
            options: Vec::new(),
            is_master_detail: false,
            is_name_field: false,
            relationship_name: None,
            label: None,
            help_text: None,
            min_length: None,
            max_length: None,
        }
    }

    /// 論理型から定義を作成する。ネイティブ型は型マッパーで解決される。
    pub fn logical(name: impl Into<String>, field_type: FieldType) -> Self {
        let mut col = Self::new(name, field_type.as_str());
        col.logical_type = Some(field_type);
        col
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_reference_to(mut self, targets: &[&str]) -> Self {
        self.reference_to = targets.iter().map(|t| (*t).to_string()).collect();
        self
    }

    pub fn with_on_delete(mut self, rule: DeleteRule) -> Self {
        self.on_delete = Some(rule);
        self
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().map(|o| (*o).to_string()).collect();
        self
    }

    pub fn with_formula(mut self, expression: impl Into<String>, return_type: FieldType) -> Self {
        self.formula = Some(expression.into());
        self.return_type = Some(return_type);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_master_detail(mut self) -> Self {
        self.is_master_detail = true;
        self
    }

    /// 検証と登録に使う論理型。明示指定がなければネイティブ型欄の論理型名を使う。
    pub fn effective_logical_type(&self) -> Option<FieldType> {
        self.logical_type
            .or_else(|| FieldType::from_str_value(&self.column_type))
    }

    /// 外部キーの対象となる最初の非空参照先。
    pub fn primary_reference(&self) -> Option<&str> {
        self.reference_to
            .iter()
            .map(|r| r.trim())
            .find(|r| !r.is_empty())
    }

    pub fn is_polymorphic(&self) -> bool {
        self.reference_to.len() > 1
    }

    /// 計算式が空でない Formula カラムかどうか。
    pub fn is_generated(&self) -> bool {
        self.effective_logical_type() == Some(FieldType::Formula)
            && self
                .formula
                .as_deref()
                .is_some_and(|f| !f.trim().is_empty())
    }
}
