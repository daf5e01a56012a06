#[cfg(test)]
mod tests {
    use crate::argument::{ArgumentProperty, ArgumentSource, PropertyMeta, SqlArgument, Tracked};
    use crate::field_mapper::{pascal_case_mapper, set_default_field_mapper_scoped};
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Account {
        account_key: i64,
        display_name: String,
        password_hash: String,
        created_by: Option<i64>,
    }

    crate::sql_argument! {
        impl Account {
            account_key: { column: "AccountKey", flags: [key] },
            display_name: { column: "" },
            password_hash: { column: "PasswordHash", flags: [ignore] },
            created_by: { column: "CreatedBy", flags: [ignore_on_update, omit_empty] },
        }
    }

    #[test]
    fn macro_generates_property_metadata() {
        assert_eq!(
            Account::PROPERTIES[0],
            PropertyMeta::new("account_key", "AccountKey").key()
        );
        assert_eq!(
            Account::PROPERTIES[3],
            PropertyMeta::new("created_by", "CreatedBy")
                .ignore_on_update()
                .omit_empty()
        );
        assert!(Account::PROPERTIES[2].ignore);
    }

    #[test]
    fn object_properties_use_field_mapper_for_blank_columns() {
        let _g = set_default_field_mapper_scoped(Arc::new(pascal_case_mapper));
        let a = Account {
            account_key: 3,
            display_name: "Ann".to_string(),
            password_hash: "x".to_string(),
            created_by: None,
        };

        let props = a.properties();
        let columns: Vec<&str> = props.iter().map(|p| p.column.as_str()).collect();
        // ignore 的属性不出现
        assert_eq!(columns, vec!["AccountKey", "DisplayName", "CreatedBy"]);
        assert!(props[0].is_key);
        assert_eq!(props[1].value, SqlValue::from("Ann"));
        assert!(props[2].ignore_on_update && props[2].is_omitted());
        assert!(!a.is_map());
        assert_eq!(a.changed_properties(), None);
    }

    #[test]
    fn property_value_matches_name_or_column() {
        let a = Account {
            account_key: 3,
            ..Account::default()
        };
        assert_eq!(a.property_value("ACCOUNT_KEY"), Some(SqlValue::I64(3)));
        assert_eq!(a.property_value("accountkey"), Some(SqlValue::I64(3)));
        assert_eq!(a.property_value("password_hash"), None);
    }

    #[test]
    fn maps_are_map_arguments() {
        let mut m = BTreeMap::new();
        m.insert("Name", SqlValue::from("A"));
        m.insert("Region", SqlValue::Null);
        assert!(m.is_map());
        assert_eq!(
            m.properties(),
            vec![
                ArgumentProperty::entry("Name", "A"),
                ArgumentProperty::entry("Region", SqlValue::Null),
            ]
        );

        let h: HashMap<String, Option<i64>> = HashMap::from([("Qty".to_string(), Some(2))]);
        assert_eq!(h.property_value("qty"), Some(SqlValue::I64(2)));
    }

    #[test]
    fn tracked_records_changes() {
        let mut t = Tracked::new(Account::default());
        assert_eq!(t.changed_properties(), Some(Vec::new()));

        t.update("display_name", |a| a.display_name = "Bo".to_string())
            .mark_changed("DISPLAY_NAME")
            .mark_changed("created_by");
        assert_eq!(
            t.changed_properties(),
            Some(vec!["display_name".to_string(), "created_by".to_string()])
        );
        assert!(t.is_changed("Created_By"));
        assert_eq!(t.get().display_name, "Bo");

        t.accept_changes();
        assert_eq!(t.changed_properties(), Some(Vec::new()));
        assert_eq!(t.into_inner().display_name, "Bo");
    }
}
