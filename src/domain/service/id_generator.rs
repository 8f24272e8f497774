//! レジストリ行の識別子生成。
//! 同じ名前からは常に同じ id が得られるため、再実行しても行が重複しない。

use uuid::Uuid;

/// 決定的 id 用の名前空間。
const REGISTRY_NAMESPACE: Uuid = Uuid::from_u128(0x6b31_7330_2d73_6368_656d_612d_7265_6731);

fn named(kind: &str, name: &str) -> String {
    Uuid::new_v5(&REGISTRY_NAMESPACE, format!("{kind}:{name}").as_bytes()).to_string()
}

/// `_System_Object` の id。
pub fn object_id(api_name: &str) -> String {
    named("object", api_name)
}

/// `_System_Field` の id。
pub fn field_id(object_api_name: &str, field_api_name: &str) -> String {
    named("field", &format!("{object_api_name}.{field_api_name}"))
}

/// `_System_Table` の id。
pub fn table_id(table_name: &str) -> String {
    named("table", table_name)
}

pub fn random_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_deterministic() {
        assert_eq!(object_id("invoice"), object_id("invoice"));
        assert_eq!(field_id("invoice", "total"), field_id("invoice", "total"));
        assert_eq!(table_id("invoice"), table_id("invoice"));
    }

    #[test]
    fn test_kinds_do_not_collide() {
        assert_ne!(object_id("invoice"), table_id("invoice"));
        assert_ne!(
            field_id("invoice", "total"),
            field_id("invoice", "due_date")
        );
        assert_ne!(field_id("a", "b_c"), field_id("a_b", "c"));
    }

    #[test]
    fn test_ids_fit_registry_column() {
        let id = field_id("invoice", "total");
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(random_id(), random_id());
    }
}
