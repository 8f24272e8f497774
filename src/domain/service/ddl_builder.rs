//! テーブル・カラム定義から PostgreSQL の DDL 文を組み立てる。
//! 副作用を持たず、識別子はすべてダブルクォートで囲む。

use crate::domain::entity::{
    ColumnDefinition, DdlOperation, DdlStatement, ForeignKeyDefinition, IndexDefinition,
    TableDefinition,
};
use crate::domain::service::type_mapper::{self, SQL_NUMERIC_18_6};
use crate::domain::value_object::DeleteRule;

/// 参照先カラムが省略されたときの主キー名。
const DEFAULT_REFERENCED_COLUMN: &str = "id";

/// SQL 識別子をクォートする。内部のダブルクォートは二重化する。
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn default_index_name(table_name: &str, columns: &[String]) -> String {
    format!("idx_{}_{}", table_name, columns.join("_"))
}

/// 参照カラム追加時の外部キー制約名。
pub fn foreign_key_name(table_name: &str, column_name: &str) -> String {
    format!("fk_{table_name}_{column_name}")
}

/// 数式中の関数名を PostgreSQL の表記に置き換える。
pub fn convert_formula_to_sql(expression: &str) -> String {
    expression
        .replace("TODAY()", "CURRENT_DATE")
        .replace("today()", "CURRENT_DATE")
        .replace("LEN(", "CHAR_LENGTH(")
        .replace("len(", "CHAR_LENGTH(")
}

/// カラムのネイティブ型。論理型の明示指定を優先する。
pub fn native_type(col: &ColumnDefinition) -> String {
    match col.logical_type {
        Some(t) => type_mapper::map_logical_type(t).to_string(),
        None => type_mapper::map_field_type_to_sql(&col.column_type),
    }
}

fn formula_storage_type(col: &ColumnDefinition) -> &'static str {
    match col.return_type {
        Some(t) if !t.is_numeric() => type_mapper::map_logical_type(t),
        _ => SQL_NUMERIC_18_6,
    }
}

/// カラム定義1つ分の DDL 断片を組み立てる。
pub fn build_column_ddl(col: &ColumnDefinition) -> String {
    let name = quote_identifier(&col.name);

    if col.is_generated() {
        let expression = convert_formula_to_sql(col.formula.as_deref().unwrap_or_default());
        return format!(
            "{name} {} GENERATED ALWAYS AS ({expression}) STORED",
            formula_storage_type(col)
        );
    }

    let mut parts = vec![name, native_type(col)];
    if !col.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = col.default_value.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("DEFAULT {default}"));
    }
    if col.auto_increment {
        parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string());
    }
    if col.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }
    if col.unique && !col.primary_key {
        parts.push("UNIQUE".to_string());
    }
    parts.join(" ")
}

/// ユニークインデックスを CREATE TABLE 内のインライン制約として組み立てる。
pub fn build_index_ddl(table_name: &str, index: &IndexDefinition) -> String {
    let name = index
        .name
        .clone()
        .unwrap_or_else(|| default_index_name(table_name, &index.columns));
    format!(
        "CONSTRAINT {} UNIQUE ({})",
        quote_identifier(&name),
        quote_list(&index.columns)
    )
}

/// 非ユニークインデックスを独立した CREATE INDEX 文として組み立てる。
pub fn build_create_index(table_name: &str, index: &IndexDefinition) -> DdlStatement {
    let name = index
        .name
        .clone()
        .unwrap_or_else(|| default_index_name(table_name, &index.columns));
    let sql = format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_identifier(&name),
        quote_identifier(table_name),
        quote_list(&index.columns)
    );
    DdlStatement::new(
        DdlOperation::CreateIndex {
            table: table_name.to_string(),
            index: name,
        },
        sql,
    )
}

/// `table(column)` 形式の参照を分解する。カラム省略時は `id` を参照する。
pub fn parse_reference(references: &str) -> (String, String) {
    let trimmed = references.trim();
    if let Some((table, rest)) = trimmed.split_once('(') {
        let column = rest.trim_end_matches(')').trim();
        if !table.trim().is_empty() && !column.is_empty() {
            return (table.trim().to_string(), column.to_string());
        }
    }
    (trimmed.to_string(), DEFAULT_REFERENCED_COLUMN.to_string())
}

/// 参照動作を SQL キーワードに正規化する。解釈できない値は出力しない。
fn referential_action(action: &str) -> Option<&'static str> {
    if let Some(rule) = DeleteRule::from_str_value(action) {
        return Some(rule.to_sql());
    }
    match action.trim().to_ascii_uppercase().as_str() {
        "NO ACTION" => Some("NO ACTION"),
        "SET DEFAULT" => Some("SET DEFAULT"),
        _ => None,
    }
}

/// テーブル定義レベルの外部キーを ALTER TABLE で追加する文。
/// 制約名は参照カラムの追加時と同じ `fk_{table}_{column}`。
pub fn build_foreign_key_ddl(table_name: &str, fk: &ForeignKeyDefinition) -> DdlStatement {
    let (ref_table, ref_column) = parse_reference(&fk.references);
    let constraint = foreign_key_name(table_name, &fk.column);
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(table_name),
        quote_identifier(&constraint),
        quote_identifier(&fk.column),
        quote_identifier(&ref_table),
        quote_identifier(&ref_column)
    );
    if let Some(action) = fk.on_delete.as_deref().and_then(referential_action) {
        sql.push_str(&format!(" ON DELETE {action}"));
    }
    if let Some(action) = fk.on_update.as_deref().and_then(referential_action) {
        sql.push_str(&format!(" ON UPDATE {action}"));
    }
    DdlStatement::new(
        DdlOperation::AddForeignKey {
            table: table_name.to_string(),
            constraint,
            references: ref_table,
        },
        sql,
    )
}

/// テーブル定義の外部キー群。参照先が揃ってから実行する。
pub fn build_table_foreign_keys(def: &TableDefinition) -> Vec<DdlStatement> {
    def.foreign_keys
        .iter()
        .map(|fk| build_foreign_key_ddl(&def.table_name, fk))
        .collect()
}

/// CREATE TABLE 文と、その直後に同じトランザクションで実行する CREATE INDEX 文を組み立てる。
/// 外部キーは含めない（`build_table_foreign_keys`）。
pub fn build_create_table(def: &TableDefinition) -> Vec<DdlStatement> {
    let mut entries: Vec<String> = def.columns.iter().map(build_column_ddl).collect();
    entries.extend(
        def.indices
            .iter()
            .filter(|idx| idx.unique)
            .map(|idx| build_index_ddl(&def.table_name, idx)),
    );

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_identifier(&def.table_name),
        entries.join(",\n    ")
    );

    let mut statements = vec![DdlStatement::new(
        DdlOperation::CreateTable {
            table: def.table_name.clone(),
            columns: def.columns.iter().map(|c| c.name.clone()).collect(),
        },
        sql,
    )];
    statements.extend(
        def.indices
            .iter()
            .filter(|idx| !idx.unique)
            .map(|idx| build_create_index(&def.table_name, idx)),
    );
    statements
}

pub fn build_add_column(table_name: &str, col: &ColumnDefinition) -> DdlStatement {
    DdlStatement::new(
        DdlOperation::AddColumn {
            table: table_name.to_string(),
            column: col.name.clone(),
        },
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_identifier(table_name),
            build_column_ddl(col)
        ),
    )
}

pub fn build_drop_column(table_name: &str, column_name: &str) -> DdlStatement {
    DdlStatement::new(
        DdlOperation::DropColumn {
            table: table_name.to_string(),
            column: column_name.to_string(),
        },
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_identifier(table_name),
            quote_identifier(column_name)
        ),
    )
}

/// 型変更（拡張のみ）の ALTER 文。既存値は新しい型へキャストする。
pub fn build_alter_column_type(table_name: &str, col: &ColumnDefinition) -> DdlStatement {
    let column = quote_identifier(&col.name);
    let new_type = native_type(col);
    DdlStatement::new(
        DdlOperation::AlterColumnType {
            table: table_name.to_string(),
            column: col.name.clone(),
        },
        format!(
            "ALTER TABLE {} ALTER COLUMN {column} TYPE {new_type} USING {column}::{new_type}",
            quote_identifier(table_name)
        ),
    )
}

/// 参照先を持つカラムに外部キー制約を追加する文。参照先がなければ None。
pub fn build_add_reference_constraint(
    table_name: &str,
    col: &ColumnDefinition,
) -> Option<DdlStatement> {
    let target = col.primary_reference()?;
    let constraint = foreign_key_name(table_name, &col.name);
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_identifier(table_name),
        quote_identifier(&constraint),
        quote_identifier(&col.name),
        quote_identifier(target),
        quote_identifier(DEFAULT_REFERENCED_COLUMN)
    );
    if let Some(rule) = col.on_delete {
        sql.push_str(&format!(" ON DELETE {}", rule.to_sql()));
    }
    Some(DdlStatement::new(
        DdlOperation::AddForeignKey {
            table: table_name.to_string(),
            constraint,
            references: target.to_string(),
        },
        sql,
    ))
}

pub fn build_drop_table(table_name: &str) -> DdlStatement {
    DdlStatement::new(
        DdlOperation::DropTable {
            table: table_name.to_string(),
        },
        format!("DROP TABLE IF EXISTS {}", quote_identifier(table_name)),
    )
}
