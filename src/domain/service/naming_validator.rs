//! 識別子の命名規則と論理型ごとの整合性を検証する純粋関数群。
//! 違反は DDL を組み立てる前に即座に返し、リトライはしない。

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::entity::ColumnDefinition;
use crate::domain::error::SchemaError;
use crate::domain::value_object::FieldType;

/// 手書きのシステムテーブルに付く予約プレフィックス。
pub const SYSTEM_TABLE_PREFIX: &str = "_System_";

static IDENTIFIER_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$"));

fn is_snake_case(name: &str) -> Result<bool, SchemaError> {
    match &*IDENTIFIER_PATTERN {
        Ok(re) => Ok(re.is_match(name)),
        Err(e) => Err(SchemaError::validation(format!(
            "identifier pattern failed to compile: {e}"
        ))),
    }
}

pub fn is_system_table(name: &str) -> bool {
    name.starts_with(SYSTEM_TABLE_PREFIX)
}

/// テーブル名を検証する。システムテーブルは snake_case を強制しない。
pub fn validate_table_name(name: &str) -> Result<(), SchemaError> {
    if is_system_table(name) {
        return Ok(());
    }
    if !is_snake_case(name)? {
        return Err(SchemaError::validation(format!(
            "table name '{name}' must be snake_case (lowercase, alphanumeric, underscores)"
        )));
    }
    Ok(())
}

pub fn validate_column_name(name: &str) -> Result<(), SchemaError> {
    if !is_snake_case(name)? {
        return Err(SchemaError::validation(format!(
            "field name '{name}' must be snake_case (lowercase, alphanumeric, underscores)"
        )));
    }
    Ok(())
}

/// カラム名と論理型固有の前提を検証する。
pub fn validate_field_definition(col: &ColumnDefinition) -> Result<(), SchemaError> {
    validate_column_name(&col.name)?;

    match col.effective_logical_type() {
        Some(FieldType::Lookup) => {
            if col.primary_reference().is_none() {
                return Err(SchemaError::validation(format!(
                    "lookup field '{}' must have a valid 'reference_to' target",
                    col.name
                )));
            }
        }
        Some(FieldType::Picklist) => {
            if col.options.is_empty() {
                return Err(SchemaError::validation(format!(
                    "picklist field '{}' must have at least one option",
                    col.name
                )));
            }
        }
        Some(FieldType::Formula) => {
            if col.formula.as_deref().is_none_or(|f| f.trim().is_empty()) {
                return Err(SchemaError::validation(format!(
                    "formula field '{}' must have a formula expression",
                    col.name
                )));
            }
            if col.return_type.is_none() {
                return Err(SchemaError::validation(format!(
                    "formula field '{}' must have a valid return_type",
                    col.name
                )));
            }
        }
        _ => {}
    }

    Ok(())
}
