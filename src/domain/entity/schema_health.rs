use serde::{Deserialize, Serialize};

pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_UNHEALTHY: &str = "unhealthy";
pub const STATUS_OPERATIONAL: &str = "operational";

/// SchemaHealth はレジストリと実テーブルを突き合わせた結果。永続化しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaHealth {
    pub status: String,
    pub expected_count: usize,
    pub actual_count: usize,
    pub missing_tables: Vec<String>,
    pub registry_health: String,
}

impl SchemaHealth {
    /// 欠落テーブル一覧から結果を組み立てる。一覧は名前順に整列する。
    pub fn from_counts(
        expected_count: usize,
        actual_count: usize,
        mut missing_tables: Vec<String>,
    ) -> Self {
        missing_tables.sort();
        let status = if missing_tables.is_empty() {
            STATUS_HEALTHY
        } else {
            STATUS_UNHEALTHY
        };
        Self {
            status: status.to_string(),
            expected_count,
            actual_count,
            missing_tables,
            registry_health: STATUS_OPERATIONAL.to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == STATUS_HEALTHY
    }
}

/// SchemaDrift は1テーブル分のドリフト検出結果。
/// レジストリにあって物理的に存在しないカラムのみを報告する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDrift {
    pub table_name: String,
    pub missing_columns: Vec<String>,
}

impl SchemaDrift {
    pub fn has_drift(&self) -> bool {
        !self.missing_columns.is_empty()
    }
}
