#[cfg(test)]
mod tests {
    use crate::argument::ArgumentSource;
    use crate::entry::BoundValue;
    use crate::error::BindError;
    use crate::flavor::{Flavor, set_default_flavor_scoped};
    use crate::metadata::ColumnMetadata;
    use crate::options::ArgumentOptions;
    use crate::rules::{
        AuditContext, AuditRule, AuditRules, DateTimeRule, OperationKind, OperationTypes,
        SoftDeleteRule, UserDataRule, ValidationErrors, ValidationRule,
    };
    use crate::sql_builder::SqlBuilder;
    use crate::value::SqlValue;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn fixed_clock() -> OffsetDateTime {
        datetime!(2026-01-02 03:04:05 UTC)
    }

    fn order_table() -> SqlBuilder {
        SqlBuilder::new(
            "dbo.Order",
            vec![
                ColumnMetadata::new("OrderKey", None).primary_key().identity(),
                ColumnMetadata::new("Amount", None),
                ColumnMetadata::new("CreatedBy", None).computed(),
                ColumnMetadata::new("UpdatedDate", None),
                ColumnMetadata::new("IsDeleted", None),
            ],
        )
        .unwrap()
    }

    fn amount(v: i64) -> HashMap<&'static str, i64> {
        HashMap::from([("Amount", v)])
    }

    #[test]
    fn operation_types_flags() {
        let t = OperationTypes::INSERT | OperationTypes::DELETE;
        assert!(t.includes(OperationKind::Insert));
        assert!(t.includes(OperationKind::Delete));
        assert!(!t.includes(OperationKind::Update));
        assert!(OperationTypes::INSERT_OR_UPDATE.includes(OperationKind::Update));
        assert!(!OperationTypes::NONE.includes(OperationKind::Select));
        assert!(!t.contains(OperationTypes::NONE));
    }

    #[test]
    fn rule_lookup_by_column_and_operation() {
        let rules = AuditRules::new()
            .with_rule(DateTimeRule::new("UpdatedDate", OperationTypes::UPDATE))
            .with_rule(SoftDeleteRule::new("IsDeleted", true))
            .with_rule(ValidationRule::new(OperationTypes::INSERT, |_| Ok(())));
        assert_eq!(rules.len(), 3);

        assert_eq!(
            rules
                .column_rules_for("updateddate", OperationKind::Update)
                .count(),
            1
        );
        assert_eq!(
            rules
                .column_rules_for("UpdatedDate", OperationKind::Insert)
                .count(),
            0
        );
        assert_eq!(rules.rules_for(OperationKind::Insert).count(), 1);
        assert_eq!(rules.rules_for(OperationKind::Update).count(), 1);
        assert_eq!(rules.rules_for(OperationKind::Select).count(), 1);

        let soft: Vec<&str> = rules
            .soft_delete_rules_for(OperationKind::Select)
            .map(|r| r.column())
            .collect();
        assert_eq!(soft, vec!["IsDeleted"]);
        assert_eq!(rules.soft_delete_rules_for(OperationKind::Insert).count(), 0);

        // 规则集合可整体克隆
        let copy = rules.clone();
        assert_eq!(copy.len(), rules.len());
    }

    #[test]
    fn date_time_rule_uses_clock() {
        let rule = DateTimeRule::new("UpdatedDate", OperationTypes::UPDATE).with_clock(fixed_clock);
        let v = rule.generate_value(None, None, None).unwrap();
        assert_eq!(v, Some(SqlValue::from(fixed_clock())));
    }

    #[test]
    fn user_data_rule_reads_user_context() {
        let rule = UserDataRule::new("CreatedBy", "UserKey", OperationTypes::INSERT);
        let user = HashMap::from([("UserKey", 42_i64)]);
        let v = rule
            .generate_value(None, Some(&user as &dyn ArgumentSource), None)
            .unwrap();
        assert_eq!(v, Some(SqlValue::I64(42)));

        let err = rule.generate_value(None, None, None).unwrap_err();
        assert_eq!(err, BindError::MissingArgument("user"));

        let other = HashMap::from([("Name", "bob")]);
        let err = rule
            .generate_value(None, Some(&other as &dyn ArgumentSource), None)
            .unwrap_err();
        assert!(matches!(err, BindError::InvalidArgument { argument: "user", .. }));
    }

    #[test]
    fn rules_override_bound_value_and_flags() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let rules = AuditRules::new()
            .with_rule(UserDataRule::new(
                "CreatedBy",
                "UserKey",
                OperationTypes::INSERT,
            ))
            .with_rule(DateTimeRule::new("Amount", OperationTypes::UPDATE).with_clock(fixed_clock));
        let user = HashMap::from([("UserKey", 7_i64)]);
        let audit = AuditContext::new(&rules).with_user(&user);

        let mut b = order_table();
        b.apply_argument_value(audit, OperationKind::Insert, &amount(10), ArgumentOptions::new())
            .unwrap();

        // 计算列原本不可插入，规则强制其参与 INSERT
        let created_by = b.try_get_entry("CreatedBy").unwrap();
        assert_eq!(created_by.value, BoundValue::Value(SqlValue::I64(7)));
        assert!(created_by.use_for_insert);
        assert!(!created_by.use_for_update);
        // Update 规则在 Insert 时不生效
        assert_eq!(
            b.try_get_entry("Amount").unwrap().value,
            BoundValue::Value(SqlValue::I64(10))
        );

        let mut b = order_table();
        b.apply_argument_value(audit, OperationKind::Update, &amount(10), ArgumentOptions::new())
            .unwrap();
        assert_eq!(
            b.try_get_entry("Amount").unwrap().value,
            BoundValue::Value(SqlValue::from(fixed_clock()))
        );
    }

    #[test]
    fn rules_clear_table_column_reference() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let rules = AuditRules::new()
            .with_rule(DateTimeRule::new("UpdatedDate", OperationTypes::INSERT).with_clock(fixed_clock));
        let tvp = vec![
            ColumnMetadata::<String>::new("Amount", None),
            ColumnMetadata::new("UpdatedDate", None),
        ];

        let mut b = order_table();
        b.apply_table_type(AuditContext::new(&rules), OperationKind::Insert, &tvp)
            .unwrap();
        assert_eq!(
            b.try_get_entry("Amount").unwrap().value,
            BoundValue::TableColumn("Amount".into())
        );
        assert_eq!(
            b.try_get_entry("UpdatedDate").unwrap().value,
            BoundValue::Value(SqlValue::from(fixed_clock()))
        );
    }

    #[test]
    fn soft_delete_update_uses_delete_rules() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let rules = AuditRules::new().with_rule(SoftDeleteRule::new("IsDeleted", true));
        let key = HashMap::from([("OrderKey", 9_i64)]);

        let mut b = order_table();
        b.apply_argument_value(
            AuditContext::new(&rules),
            OperationKind::Update,
            &key,
            ArgumentOptions::new(),
        )
        .unwrap();
        assert_eq!(b.try_get_entry("IsDeleted").unwrap().value, BoundValue::Unset);

        let mut b = order_table();
        b.apply_argument_value(
            AuditContext::new(&rules),
            OperationKind::Update,
            &key,
            ArgumentOptions::new().soft_delete(true),
        )
        .unwrap();
        let deleted = b.try_get_entry("IsDeleted").unwrap();
        assert_eq!(deleted.value, BoundValue::Value(SqlValue::Bool(true)));
        assert!(deleted.use_for_update);
    }

    #[test]
    fn validation_rule_aborts_binding() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let rules = AuditRules::new().with_rule(ValidationRule::new(
            OperationTypes::INSERT_OR_UPDATE,
            |arg: &dyn ArgumentSource| {
                let mut errors = ValidationErrors::new();
                if arg
                    .property_value("Amount")
                    .is_some_and(|v| v == SqlValue::I64(0))
                {
                    errors.push("Amount", "must not be zero");
                }
                errors.into_result()
            },
        ));

        let mut b = order_table();
        let err = b
            .apply_argument_value(
                AuditContext::new(&rules),
                OperationKind::Insert,
                &amount(0),
                ArgumentOptions::new(),
            )
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "binder validation failed: Amount: must not be zero"
        );
        assert!(!err.is_mapping_error());
        // 失败的绑定不留下半截状态
        assert_eq!(b.try_get_entry("Amount").unwrap().value, BoundValue::Unset);

        b.apply_argument_value(
            AuditContext::new(&rules),
            OperationKind::Insert,
            &amount(3),
            ArgumentOptions::new(),
        )
        .unwrap();
    }

    /// 要求 INSERT 时必须提供 Amount 的列规则。
    #[derive(Debug, Clone)]
    struct RequireAmount;

    impl AuditRule for RequireAmount {
        fn applies_when(&self) -> OperationTypes {
            OperationTypes::INSERT
        }

        fn column_name(&self) -> Option<&str> {
            Some("Amount")
        }

        fn check_argument(
            &self,
            argument: Option<&dyn ArgumentSource>,
            _operation: OperationKind,
        ) -> crate::error::Result<()> {
            match argument.and_then(|a| a.property_value("Amount")) {
                Some(_) => Ok(()),
                None => Err(BindError::invalid_argument("argument", "Amount is required")),
            }
        }

    }

    #[test]
    fn column_rule_checks_whole_argument() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let rules = AuditRules::new().with_rule(RequireAmount);

        let mut b = order_table();
        let key = HashMap::from([("OrderKey", 1_i64)]);
        let err = b
            .apply_argument_value(
                AuditContext::new(&rules),
                OperationKind::Insert,
                &key,
                ArgumentOptions::new(),
            )
            .unwrap_err();
        assert!(matches!(err, BindError::InvalidArgument { argument: "argument", .. }));
        assert_eq!(b.try_get_entry("OrderKey").unwrap().value, BoundValue::Unset);

        // Update 不适用该规则
        let mut b = order_table();
        b.apply_argument_value(
            AuditContext::new(&rules),
            OperationKind::Update,
            &key,
            ArgumentOptions::new(),
        )
        .unwrap();

        let mut b = order_table();
        b.apply_argument_value(
            AuditContext::new(&rules),
            OperationKind::Insert,
            &amount(5),
            ArgumentOptions::new(),
        )
        .unwrap();
        let amount_entry = b.try_get_entry("Amount").unwrap();
        assert_eq!(amount_entry.value, BoundValue::Value(SqlValue::I64(5)));
        assert!(amount_entry.use_for_insert);
    }

    #[test]
    fn failed_rule_restores_entries() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let rules = AuditRules::new().with_rule(UserDataRule::new(
            "CreatedBy",
            "UserKey",
            OperationTypes::INSERT,
        ));

        let mut b = order_table();
        let before = b.clone();
        let err = b
            .apply_argument_value(
                AuditContext::new(&rules),
                OperationKind::Insert,
                &amount(10),
                ArgumentOptions::new(),
            )
            .unwrap_err();
        assert_eq!(err, BindError::MissingArgument("user"));
        assert_eq!(b, before);

        let err = b
            .apply_rules(AuditContext::new(&rules), OperationKind::Insert, None)
            .unwrap_err();
        assert_eq!(err, BindError::MissingArgument("user"));
        assert_eq!(b, before);
    }
}
