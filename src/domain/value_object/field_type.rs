use serde::{Deserialize, Serialize};
use std::fmt;

/// FieldType はフィールドの論理型（製品レベルの型）を表す。
/// 物理的な格納型とは独立しており、レジストリ上ではこちらが正となる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    TextArea,
    LongTextArea,
    RichText,
    Number,
    Currency,
    Percent,
    Boolean,
    Date,
    DateTime,
    Email,
    Phone,
    Url,
    Picklist,
    MultiPicklist,
    Lookup,
    MasterDetail,
    AutoNumber,
    Formula,
    RollupSummary,
    Password,
    EncryptedString,
    #[serde(rename = "JSON")]
    Json,
}

impl FieldType {
    pub const ALL: [FieldType; 23] = [
        Self::Text,
        Self::TextArea,
        Self::LongTextArea,
        Self::RichText,
        Self::Number,
        Self::Currency,
        Self::Percent,
        Self::Boolean,
        Self::Date,
        Self::DateTime,
        Self::Email,
        Self::Phone,
        Self::Url,
        Self::Picklist,
        Self::MultiPicklist,
        Self::Lookup,
        Self::MasterDetail,
        Self::AutoNumber,
        Self::Formula,
        Self::RollupSummary,
        Self::Password,
        Self::EncryptedString,
        Self::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::TextArea => "TextArea",
            Self::LongTextArea => "LongTextArea",
            Self::RichText => "RichText",
            Self::Number => "Number",
            Self::Currency => "Currency",
            Self::Percent => "Percent",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::DateTime => "DateTime",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Url => "Url",
            Self::Picklist => "Picklist",
            Self::MultiPicklist => "MultiPicklist",
            Self::Lookup => "Lookup",
            Self::MasterDetail => "MasterDetail",
            Self::AutoNumber => "AutoNumber",
            Self::Formula => "Formula",
            Self::RollupSummary => "RollupSummary",
            Self::Password => "Password",
            Self::EncryptedString => "EncryptedString",
            Self::Json => "JSON",
        }
    }

    /// 論理型名を解釈する。大文字小文字は区別しない。
    /// 論理型でない文字列（生の SQL 型など）は None を返す。
    pub fn from_str_value(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        // 旧名 Checkbox は Boolean として扱う
        if trimmed.eq_ignore_ascii_case("checkbox") {
            return Some(Self::Boolean);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
    }

    /// 数値系の論理型かどうか。
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Number | Self::Currency | Self::Percent | Self::RollupSummary
        )
    }

    /// 他オブジェクトを参照するリレーション型かどうか。
    pub fn is_relationship(&self) -> bool {
        matches!(self, Self::Lookup | Self::MasterDetail)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_value_roundtrip() {
        for t in FieldType::ALL {
            assert_eq!(FieldType::from_str_value(t.as_str()), Some(t));
        }
    }

    #[test]
    fn test_from_str_value_case_insensitive() {
        assert_eq!(
            FieldType::from_str_value("picklist"),
            Some(FieldType::Picklist)
        );
        assert_eq!(FieldType::from_str_value("json"), Some(FieldType::Json));
        assert_eq!(
            FieldType::from_str_value("Checkbox"),
            Some(FieldType::Boolean)
        );
    }

    #[test]
    fn test_from_str_value_rejects_sql_types() {
        assert_eq!(FieldType::from_str_value("VARCHAR(255)"), None);
        assert_eq!(FieldType::from_str_value(""), None);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FieldType::Json).unwrap();
        assert_eq!(json, "\"JSON\"");
        let parsed: FieldType = serde_json::from_str("\"MasterDetail\"").unwrap();
        assert_eq!(parsed, FieldType::MasterDetail);
    }

    #[test]
    fn test_numeric_and_relationship() {
        assert!(FieldType::Currency.is_numeric());
        assert!(!FieldType::Text.is_numeric());
        assert!(FieldType::MasterDetail.is_relationship());
        assert!(!FieldType::Picklist.is_relationship());
    }
}
