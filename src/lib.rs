//! k1s0 CRM のメタデータ駆動スキーマ進化エンジン。
//!
//! 物理テーブル・カラムの DDL と、`_System_Table` / `_System_Object` / `_System_Field`
//! レジストリへの登録を冪等かつ補償付きで実行する。

pub mod domain;
pub mod infrastructure;
pub mod usecase;

pub mod test_support;
