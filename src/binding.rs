//! 值绑定：参数对象、过滤对象、读取列选择、TVP 列与审计规则。
//!
//! 所有 `apply_*` 只修改条目的分类标记与绑定值，不生成 SQL（`apply_filter_value` 例外，
//! 它直接返回 WHERE 片段）。返回错误时条目保持调用前的状态。

use crate::argument::{ArgumentProperty, ArgumentSource};
use crate::entry::BoundValue;
use crate::error::{BindError, Result};
use crate::metadata::ColumnMetadata;
use crate::options::{ArgumentOptions, DesiredColumns, FilterOptions};
use crate::rules::{AuditContext, OperationKind};
use crate::sql_builder::SqlBuilder;

impl<D: Clone> SqlBuilder<D> {
    /// 把参数对象（或 map）的值绑定到同名条目上，然后执行审计规则。
    ///
    /// 一个属性会绑定到所有同名条目（表值函数的结果列与同名形参）。
    /// `operation` 为 Update 且 `options.soft_delete` 时，规则按 Delete 查找，SQL 仍是 UPDATE。
    pub fn apply_argument_value(
        &mut self,
        audit: AuditContext<'_>,
        operation: OperationKind,
        argument: &dyn ArgumentSource,
        options: ArgumentOptions,
    ) -> Result<()> {
        self.transact(|b| b.bind_argument(audit, operation, argument, options))
    }

    /// 由过滤对象生成 `a = @a AND b IS NULL` 形式的条件，按列声明顺序输出。
    ///
    /// 过滤只绑定值并标记参数，不改 key/insert/update 标记，也不执行规则。
    /// 同名形参同样被绑定，但只有真实列出现在条件里。
    pub fn apply_filter_value(
        &mut self,
        filter: &dyn ArgumentSource,
        options: FilterOptions,
    ) -> Result<String> {
        self.transact(|b| b.bind_filter(filter, options))
    }

    /// 标记要读取的列。
    pub fn apply_desired_columns(&mut self, selection: &DesiredColumns, strict: bool) -> Result<()> {
        self.transact(|b| b.mark_desired(selection, strict))
    }

    /// 用表值参数中同名列的引用替换绑定值，然后执行审计规则。
    pub fn apply_table_type<T>(
        &mut self,
        audit: AuditContext<'_>,
        operation: OperationKind,
        tvp_columns: &[ColumnMetadata<T>],
    ) -> Result<()> {
        self.transact(|b| {
            let mut matched = 0usize;
            for e in b.entries_mut().iter_mut() {
                if let Some(c) = tvp_columns.iter().find(|c| e.matches_column_name(&c.sql_name)) {
                    e.value = BoundValue::TableColumn(c.quoted_sql_name.clone());
                    matched += 1;
                }
            }
            if matched == 0 {
                return Err(b.mapping_failure(BindError::NoMatchingTableTypeColumns {
                    subject: b.name().to_string(),
                }));
            }
            b.run_rules(audit, operation, None)
        })
    }

    /// 覆盖已匹配条目的绑定值，不改任何分类标记；匹配不到的名字直接忽略。
    pub fn apply_value_overrides(&mut self, value: &dyn ArgumentSource) {
        let is_map = value.is_map();
        for property in value.properties() {
            for i in self.find_property(is_map, &property) {
                self.entries_mut()[i].value = BoundValue::Value(property.value.clone());
            }
        }
    }

    /// 先让每条适用的规则检查整个参数对象，再对每个条目依次应用匹配的列规则。
    ///
    /// 列规则总是覆盖已有的绑定值，并强制该列参与 INSERT 和/或 UPDATE。
    pub fn apply_rules(
        &mut self,
        audit: AuditContext<'_>,
        operation: OperationKind,
        argument: Option<&dyn ArgumentSource>,
    ) -> Result<()> {
        self.transact(|b| b.run_rules(audit, operation, argument))
    }

    fn bind_argument(
        &mut self,
        audit: AuditContext<'_>,
        operation: OperationKind,
        argument: &dyn ArgumentSource,
        options: ArgumentOptions,
    ) -> Result<()> {
        let rule_operation = if operation == OperationKind::Update && options.soft_delete {
            OperationKind::Delete
        } else {
            operation
        };

        let changed = if options.changed_properties_only {
            let changed = argument.changed_properties().ok_or_else(|| {
                BindError::invalid_argument(
                    "argument",
                    "changed_properties_only requires an argument with change tracking",
                )
            })?;
            if changed.is_empty() {
                return Err(BindError::invalid_argument(
                    "argument",
                    "changed_properties_only was requested but no property has changed",
                ));
            }
            Some(changed)
        } else {
            None
        };

        let is_map = argument.is_map();
        if options.use_object_defined_keys {
            if is_map {
                return Err(BindError::invalid_argument(
                    "argument",
                    "a map argument carries no key markers for use_object_defined_keys",
                ));
            }
            for e in self.entries_mut() {
                e.is_key = false;
            }
        }

        let mut matched = 0usize;
        let mut keys = 0usize;
        for property in argument.properties() {
            let indices = self.find_property(is_map, &property);
            if indices.is_empty() {
                if options.strict {
                    return Err(self.unmatched_property(&property));
                }
                continue;
            }
            matched += 1;
            let as_key = options.use_object_defined_keys && property.is_key;
            if as_key {
                keys += 1;
            }
            let in_change_set = changed.as_ref().is_none_or(|changed| {
                changed.iter().any(|c| {
                    c.eq_ignore_ascii_case(&property.name) || c.eq_ignore_ascii_case(&property.column)
                })
            });

            for i in indices {
                let entry = &mut self.entries_mut()[i];
                if !property.is_omitted() {
                    entry.value = BoundValue::Value(property.value.clone());
                }
                if property.ignore_on_insert {
                    entry.use_for_insert = false;
                }
                if property.ignore_on_update || !in_change_set {
                    entry.use_for_update = false;
                }
                if as_key && entry.details.is_column() {
                    entry.is_key = true;
                }
            }
        }

        if matched == 0 {
            return Err(self.mapping_failure(BindError::NoMatchingProperties {
                subject: self.name().to_string(),
            }));
        }
        if options.use_object_defined_keys && keys == 0 {
            return Err(self.mapping_failure(BindError::NoMatchingKeys {
                subject: self.name().to_string(),
            }));
        }

        self.run_rules(audit, rule_operation, Some(argument))
    }

    fn bind_filter(&mut self, filter: &dyn ArgumentSource, options: FilterOptions) -> Result<String> {
        let is_map = filter.is_map();
        let mut included = vec![false; self.entries().len()];
        let mut matched = 0usize;

        for property in filter.properties() {
            let indices = self.find_property(is_map, &property);
            if indices.is_empty() {
                if options.strict {
                    return Err(self.unmatched_property(&property));
                }
                continue;
            }
            matched += 1;
            if property.is_omitted() || (options.ignore_null_properties && property.value.is_null())
            {
                continue;
            }
            for i in indices {
                let entry = &mut self.entries_mut()[i];
                entry.value = BoundValue::Value(property.value.clone());
                included[i] = entry.details.is_column();
            }
        }

        if matched == 0 {
            return Err(self.mapping_failure(BindError::NoMatchingProperties {
                subject: self.name().to_string(),
            }));
        }

        let mut parts = Vec::new();
        for (entry, _) in self
            .entries_mut()
            .iter_mut()
            .zip(included)
            .filter(|(_, included)| *included)
        {
            let is_null = entry.value.literal().is_some_and(|v| v.is_null());
            if is_null {
                parts.push(format!("{} IS NULL", entry.details.quoted_sql_name()));
            } else {
                entry.use_parameter = true;
                parts.push(format!(
                    "{} = {}",
                    entry.details.quoted_sql_name(),
                    entry.details.sql_variable_name()
                ));
            }
        }
        Ok(parts.join(" AND "))
    }

    fn mark_desired(&mut self, selection: &DesiredColumns, strict: bool) -> Result<()> {
        match selection {
            DesiredColumns::NoColumns => Ok(()),
            DesiredColumns::Auto => {
                if self.entries().iter().any(|e| e.is_key) {
                    for e in self.entries_mut().iter_mut().filter(|e| e.is_key) {
                        e.use_for_read = true;
                    }
                    return Ok(());
                }
                if self.entries().iter().any(|e| e.details.is_identity()) {
                    for e in self
                        .entries_mut()
                        .iter_mut()
                        .filter(|e| e.details.is_identity())
                    {
                        e.use_for_read = true;
                    }
                    return Ok(());
                }
                Err(self.mapping_failure(BindError::NoPrimaryKey {
                    subject: self.name().to_string(),
                }))
            }
            DesiredColumns::All => {
                for e in self
                    .entries_mut()
                    .iter_mut()
                    .filter(|e| e.details.is_column())
                {
                    e.use_for_read = true;
                }
                Ok(())
            }
            DesiredColumns::Named(names) => {
                let mut matched = 0usize;
                for name in names {
                    let Some(i) = self
                        .entries()
                        .iter()
                        .position(|e| e.details.is_column() && e.matches_column_name(name))
                    else {
                        if strict {
                            return Err(self.mapping_failure(BindError::UnmatchedColumn {
                                subject: self.name().to_string(),
                                column: name.clone(),
                            }));
                        }
                        continue;
                    };
                    self.entries_mut()[i].use_for_read = true;
                    matched += 1;
                }
                if matched == 0 {
                    return Err(self.mapping_failure(BindError::NoMatchingProperties {
                        subject: self.name().to_string(),
                    }));
                }
                Ok(())
            }
        }
    }

    fn run_rules(
        &mut self,
        audit: AuditContext<'_>,
        operation: OperationKind,
        argument: Option<&dyn ArgumentSource>,
    ) -> Result<()> {
        for rule in audit.rules.rules_for(operation) {
            rule.check_argument(argument, operation)?;
        }

        for entry in self.entries_mut().iter_mut() {
            let column = entry.details.sql_name().to_string();
            for rule in audit.rules.column_rules_for(&column, operation) {
                if let Some(v) = rule.generate_value(argument, audit.user, entry.value.literal())? {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(column = %column, ?operation, "audit rule overrode bound value");
                    entry.value = BoundValue::Value(v);
                }
                let when = rule.applies_when();
                if when.includes(OperationKind::Insert) {
                    entry.use_for_insert = true;
                }
                if when.includes(OperationKind::Update) || when.includes(OperationKind::Delete) {
                    entry.use_for_update = true;
                }
            }
        }
        Ok(())
    }

    /// 所有与属性同名的条目下标。map 按任意名字形式匹配；对象按映射出的列名匹配。
    fn find_property(&self, is_map: bool, property: &ArgumentProperty) -> Vec<usize> {
        self.entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                if is_map {
                    e.matches_any_name(&property.name)
                } else {
                    e.matches_column_name(&property.column)
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn unmatched_property(&self, property: &ArgumentProperty) -> BindError {
        self.mapping_failure(BindError::UnmatchedProperty {
            subject: self.name().to_string(),
            property: property.name.clone(),
        })
    }
}
