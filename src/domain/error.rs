use thiserror::Error;

/// 制約やオブジェクトの重複を表す SQLSTATE。
pub const SQLSTATE_DUPLICATE_OBJECT: &str = "42710";

/// SchemaError はスキーマ進化エンジンが返すエラー分類。
#[derive(Debug, Error)]
pub enum SchemaError {
    /// 識別子や論理型の設定が不正。リトライ対象外。
    #[error("validation failed: {0}")]
    Validation(String),

    /// データベースが DDL を拒否した。実行しようとした文を保持する。
    #[error("ddl execution failed: {message}{} (statement: {statement})", code_suffix(.sqlstate))]
    Execution {
        statement: String,
        message: String,
        sqlstate: Option<String>,
    },

    /// レジストリの読み書き（DML）が失敗した。
    #[error("database error: {message}{}", code_suffix(.sqlstate))]
    Database {
        message: String,
        sqlstate: Option<String>,
    },

    /// strict insert が既存の api_name に衝突した。
    #[error("object already registered: {0}")]
    DuplicateObject(String),

    /// 補償処理自体が失敗し、物理スキーマとメタデータが乖離したまま残っている。
    #[error("critical inconsistency: {original}; compensation failed: {compensation}")]
    CriticalInconsistency {
        original: Box<SchemaError>,
        compensation: Box<SchemaError>,
    },

    /// 物理変更は適用済みだがメタデータ更新に失敗した（警告レベル）。
    #[error("column {table}.{column} changed but metadata is stale: {message}")]
    MetadataStale {
        table: String,
        column: String,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,
}

fn code_suffix(sqlstate: &Option<String>) -> String {
    sqlstate
        .as_deref()
        .map(|code| format!(" [SQLSTATE {code}]"))
        .unwrap_or_default()
}

impl SchemaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            sqlstate: None,
        }
    }

    /// DDL 実行エラーを文付きで構築する。
    pub fn execution(statement: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Execution {
            statement: statement.into(),
            message: err.to_string(),
            sqlstate: None,
        }
    }

    /// sqlx のエラーから DDL 実行エラーを構築する。SQLSTATE はそのまま保持する。
    pub fn execution_from_sqlx(statement: impl Into<String>, err: &sqlx::Error) -> Self {
        let (message, sqlstate) = split_sqlx_error(err);
        Self::Execution {
            statement: statement.into(),
            message,
            sqlstate,
        }
    }

    /// SQLSTATE を付与する。Execution / Database 以外はそのまま返す。
    pub fn with_sqlstate(mut self, code: impl Into<String>) -> Self {
        if let Self::Execution { sqlstate, .. } | Self::Database { sqlstate, .. } = &mut self {
            *sqlstate = Some(code.into());
        }
        self
    }

    pub fn critical(original: SchemaError, compensation: SchemaError) -> Self {
        Self::CriticalInconsistency {
            original: Box::new(original),
            compensation: Box::new(compensation),
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CriticalInconsistency { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Self::Database { sqlstate, .. } | Self::Execution { sqlstate, .. } => {
                sqlstate.as_deref()
            }
            _ => None,
        }
    }

    /// 追加しようとした制約が既に存在したことによる DDL 失敗か。
    pub fn is_duplicate_constraint(&self) -> bool {
        match self {
            Self::Execution { message, .. } => {
                self.sqlstate() == Some(SQLSTATE_DUPLICATE_OBJECT)
                    || message.contains("already exists")
            }
            _ => false,
        }
    }
}

/// sqlx のエラーをメッセージと SQLSTATE に分ける。
fn split_sqlx_error(err: &sqlx::Error) -> (String, Option<String>) {
    match err {
        sqlx::Error::Database(db) => (db.message().to_string(), db.code().map(|c| c.into_owned())),
        other => (other.to_string(), None),
    }
}

impl From<sqlx::Error> for SchemaError {
    fn from(err: sqlx::Error) -> Self {
        let (message, sqlstate) = split_sqlx_error(&err);
        Self::Database { message, sqlstate }
    }
}
