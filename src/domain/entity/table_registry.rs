use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// TableRegistryItem は `_System_Table` の1行。棚卸しとドリフト監査に使う軽量な一覧。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegistryItem {
    pub id: String,
    pub table_name: String,
    pub table_type: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_managed: bool,
    pub schema_version: Option<String>,
    pub created_by: String,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

/// レジストリ行を作成した主体。
pub const CREATED_BY_BOOTSTRAP: &str = "bootstrap";
