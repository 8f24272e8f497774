use serde::{Deserialize, Serialize};
use std::fmt;

/// SharingModel はオブジェクトの既定共有モデル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SharingModel {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
}

impl fmt::Display for SharingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "Private"),
            Self::PublicRead => write!(f, "PublicRead"),
            Self::PublicReadWrite => write!(f, "PublicReadWrite"),
        }
    }
}

impl SharingModel {
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "Private" => Some(Self::Private),
            "PublicRead" => Some(Self::PublicRead),
            "PublicReadWrite" => Some(Self::PublicReadWrite),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_private() {
        assert_eq!(SharingModel::default(), SharingModel::Private);
    }

    #[test]
    fn test_display_and_parse() {
        for m in [
            SharingModel::Private,
            SharingModel::PublicRead,
            SharingModel::PublicReadWrite,
        ] {
            assert_eq!(SharingModel::from_str_value(&m.to_string()), Some(m));
        }
        assert_eq!(SharingModel::from_str_value("Shared"), None);
    }
}
