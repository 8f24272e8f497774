//! 論理型とネイティブ型（PostgreSQL）の相互変換。状態を持たない固定表。
//!
//! 逆変換は情報が欠落する。Lookup と MasterDetail は同じ識別子型に、
//! Number・Currency・Percent は精度だけが異なる NUMERIC に落ちるため、
//! 論理型の正はレジストリ側に置き、物理スキーマからの復元は Orphan 採用時の既定値にだけ使う。

use crate::domain::value_object::FieldType;

pub const SQL_VARCHAR_255: &str = "VARCHAR(255)";
pub const SQL_VARCHAR_50: &str = "VARCHAR(50)";
pub const SQL_VARCHAR_36: &str = "VARCHAR(36)";
pub const SQL_NUMERIC_18_6: &str = "NUMERIC(18,6)";
pub const SQL_NUMERIC_18_2: &str = "NUMERIC(18,2)";
pub const SQL_NUMERIC_5_2: &str = "NUMERIC(5,2)";
pub const SQL_TEXT: &str = "TEXT";
pub const SQL_BOOLEAN: &str = "BOOLEAN";
pub const SQL_DATE: &str = "DATE";
pub const SQL_TIMESTAMPTZ: &str = "TIMESTAMPTZ";
pub const SQL_JSONB: &str = "JSONB";

/// 論理型をネイティブ型に変換する。
pub fn map_logical_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Text
        | FieldType::Email
        | FieldType::Url
        | FieldType::Picklist
        | FieldType::AutoNumber
        | FieldType::Formula
        | FieldType::Password
        | FieldType::EncryptedString => SQL_VARCHAR_255,
        FieldType::Phone => SQL_VARCHAR_50,
        FieldType::TextArea | FieldType::LongTextArea | FieldType::RichText => SQL_TEXT,
        FieldType::Number | FieldType::RollupSummary => SQL_NUMERIC_18_6,
        FieldType::Currency => SQL_NUMERIC_18_2,
        FieldType::Percent => SQL_NUMERIC_5_2,
        FieldType::Boolean => SQL_BOOLEAN,
        FieldType::Date => SQL_DATE,
        FieldType::DateTime => SQL_TIMESTAMPTZ,
        FieldType::Lookup | FieldType::MasterDetail => SQL_VARCHAR_36,
        FieldType::MultiPicklist | FieldType::Json => SQL_JSONB,
    }
}

/// 論理型名または生の SQL 型をネイティブ型に変換する。
/// 論理型でなければシステムテーブル用の生の型として通し、未知の型は VARCHAR(255) にする。
pub fn map_field_type_to_sql(field_type: &str) -> String {
    if let Some(t) = FieldType::from_str_value(field_type) {
        return map_logical_type(t).to_string();
    }
    passthrough_sql_type(field_type).unwrap_or_else(|| SQL_VARCHAR_255.to_string())
}

fn passthrough_sql_type(raw: &str) -> Option<String> {
    let upper = raw.trim().to_ascii_uppercase();
    let mapped = match upper.as_str() {
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "SERIAL" | "BIGSERIAL" => upper.clone(),
        "TINYINT(1)" | "BOOL" | "BOOLEAN" => SQL_BOOLEAN.to_string(),
        "TINYINT" => "SMALLINT".to_string(),
        "DATETIME" | "TIMESTAMPTZ" => SQL_TIMESTAMPTZ.to_string(),
        "TIMESTAMP" | "DATE" | "TIME" | "UUID" | "TEXT" | "JSON" | "JSONB" | "BYTEA" => {
            upper.clone()
        }
        "MEDIUMTEXT" | "LONGTEXT" => SQL_TEXT.to_string(),
        "DOUBLE" | "DOUBLE PRECISION" => "DOUBLE PRECISION".to_string(),
        "REAL" | "FLOAT" => "REAL".to_string(),
        _ => return parameterized_sql_type(&upper),
    };
    Some(mapped)
}

/// `VARCHAR(n)` や `NUMERIC(p,s)` のような精度付きの型を正規化して通す。
fn parameterized_sql_type(upper: &str) -> Option<String> {
    let open = upper.find('(')?;
    let inner = upper.strip_suffix(')')?.get(open + 1..)?;
    let base = upper[..open].trim();
    let params: Vec<&str> = inner.split(',').map(str::trim).collect();
    if params
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    match (base, params.len()) {
        ("VARCHAR" | "CHAR", 1) => Some(format!("{base}({})", params[0])),
        ("NUMERIC" | "DECIMAL", 1) => Some(format!("NUMERIC({})", params[0])),
        ("NUMERIC" | "DECIMAL", 2) => Some(format!("NUMERIC({},{})", params[0], params[1])),
        _ => None,
    }
}

/// ネイティブ型から論理型を推定する（ベストエフォート）。
pub fn map_sql_type_to_logical(sql_type: &str) -> FieldType {
    let upper = sql_type.trim().to_ascii_uppercase();
    if upper.starts_with("BOOL") || upper.starts_with("TINYINT(1)") {
        FieldType::Boolean
    } else if upper.starts_with("VARCHAR")
        || upper.starts_with("CHARACTER")
        || upper.starts_with("TEXT")
        || upper.starts_with("CHAR")
    {
        FieldType::Text
    } else if [
        "INT", "BIGINT", "SMALLINT", "TINYINT", "NUMERIC", "DECIMAL", "REAL", "FLOAT", "DOUBLE",
    ]
    .iter()
    .any(|p| upper.starts_with(p))
    {
        FieldType::Number
    } else if upper.starts_with("TIMESTAMP") || upper.starts_with("DATETIME") {
        FieldType::DateTime
    } else if upper.starts_with("DATE") {
        FieldType::Date
    } else if upper.starts_with("JSON") {
        FieldType::Json
    } else {
        FieldType::Text
    }
}

/// 逆変換で区別できなくなる論理型の、戻り先となる粗い型。
pub fn coarsened_type(field_type: FieldType) -> FieldType {
    map_sql_type_to_logical(map_logical_type(field_type))
}
