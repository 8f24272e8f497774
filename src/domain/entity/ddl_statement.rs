use std::fmt;

/// DdlOperation は DDL 文が対象とする構造変更。
/// 実行器は SQL テキストを、テスト用の実行器はこちらを解釈する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlOperation {
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    CreateIndex {
        table: String,
        index: String,
    },
    AddColumn {
        table: String,
        column: String,
    },
    AlterColumnType {
        table: String,
        column: String,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AddForeignKey {
        table: String,
        constraint: String,
        references: String,
    },
    DropTable {
        table: String,
    },
}

impl DdlOperation {
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable { table, .. }
            | Self::CreateIndex { table, .. }
            | Self::AddColumn { table, .. }
            | Self::AlterColumnType { table, .. }
            | Self::DropColumn { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropTable { table } => table,
        }
    }
}

/// DdlStatement は組み立て済みの DDL 文。ログや監査にそのまま出力できる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlStatement {
    pub operation: DdlOperation,
    pub sql: String,
}

impl DdlStatement {
    pub fn new(operation: DdlOperation, sql: impl Into<String>) -> Self {
        Self {
            operation,
            sql: sql.into(),
        }
    }

    pub fn is_drop_column(&self) -> bool {
        matches!(self.operation, DdlOperation::DropColumn { .. })
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.operation, DdlOperation::AddForeignKey { .. })
    }
}

impl fmt::Display for DdlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}
