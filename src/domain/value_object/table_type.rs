use serde::{Deserialize, Serialize};
use std::fmt;

/// TableType はテーブルレジストリ上のテーブル種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    #[default]
    CustomObject,
    SystemMetadata,
    SystemCore,
    SystemData,
    SystemJunction,
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomObject => "custom_object",
            Self::SystemMetadata => "system_metadata",
            Self::SystemCore => "system_core",
            Self::SystemData => "system_data",
            Self::SystemJunction => "system_junction",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "custom_object" => Some(Self::CustomObject),
            "system_metadata" => Some(Self::SystemMetadata),
            "system_core" => Some(Self::SystemCore),
            "system_data" => Some(Self::SystemData),
            "system_junction" => Some(Self::SystemJunction),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_and_parse() {
        assert_eq!(TableType::CustomObject.as_str(), "custom_object");
        assert_eq!(
            TableType::from_str_value("system_junction"),
            Some(TableType::SystemJunction)
        );
        assert_eq!(TableType::from_str_value("view"), None);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&TableType::SystemMetadata).unwrap();
        assert_eq!(json, "\"system_metadata\"");
    }
}
