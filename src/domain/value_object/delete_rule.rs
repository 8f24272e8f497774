use serde::{Deserialize, Serialize};
use std::fmt;

/// DeleteRule は参照先レコード削除時の振る舞い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteRule {
    Restrict,
    Cascade,
    SetNull,
}

impl fmt::Display for DeleteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restrict => write!(f, "Restrict"),
            Self::Cascade => write!(f, "Cascade"),
            Self::SetNull => write!(f, "SetNull"),
        }
    }
}

impl DeleteRule {
    /// SQL 表記（`SET NULL` など）と製品表記（`SetNull`）の両方を受け付ける。
    pub fn from_str_value(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SETNULL" => Some(Self::SetNull),
            _ => None,
        }
    }

    /// `ON DELETE` 句に埋め込む SQL キーワード。
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_and_product_spelling() {
        assert_eq!(
            DeleteRule::from_str_value("SET NULL"),
            Some(DeleteRule::SetNull)
        );
        assert_eq!(
            DeleteRule::from_str_value("SetNull"),
            Some(DeleteRule::SetNull)
        );
        assert_eq!(
            DeleteRule::from_str_value("cascade"),
            Some(DeleteRule::Cascade)
        );
        assert_eq!(DeleteRule::from_str_value("NO ACTION"), None);
    }

    #[test]
    fn test_to_sql() {
        assert_eq!(DeleteRule::SetNull.to_sql(), "SET NULL");
        assert_eq!(DeleteRule::Restrict.to_sql(), "RESTRICT");
    }
}
