//! SqlBuilderEntry：一条元数据加上本次语句的分类标记与绑定值。

use crate::metadata::{ColumnMetadata, ParameterMetadata};
use crate::value::SqlValue;

/// 条目包装的元数据。
#[derive(Debug, Clone, PartialEq)]
pub enum EntryDetails<D> {
    Column(ColumnMetadata<D>),
    Parameter(ParameterMetadata<D>),
}

impl<D> EntryDetails<D> {
    pub fn name(&self) -> &str {
        match self {
            Self::Column(c) => &c.name,
            Self::Parameter(p) => &p.name,
        }
    }

    pub fn sql_name(&self) -> &str {
        match self {
            Self::Column(c) => &c.sql_name,
            Self::Parameter(p) => &p.sql_name,
        }
    }

    pub fn quoted_sql_name(&self) -> &str {
        match self {
            Self::Column(c) => &c.quoted_sql_name,
            Self::Parameter(p) => &p.quoted_sql_name,
        }
    }

    pub fn sql_variable_name(&self) -> &str {
        match self {
            Self::Column(c) => &c.sql_variable_name,
            Self::Parameter(p) => &p.sql_variable_name,
        }
    }

    pub fn db_type(&self) -> Option<&D> {
        match self {
            Self::Column(c) => c.db_type.as_ref(),
            Self::Parameter(p) => p.db_type.as_ref(),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Column(c) if c.is_identity)
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Self::Column(_))
    }
}

/// 条目上的绑定值。`Unset` 与 `Value(SqlValue::Null)` 是两回事：
/// 前者表示没有绑定，后者表示显式绑定了 SQL NULL。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BoundValue {
    #[default]
    Unset,
    Value(SqlValue),
    /// 引用表值参数（TVP）中同名列，值为该列拼进 SQL 的形式。
    TableColumn(String),
}

impl BoundValue {
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    pub fn literal(&self) -> Option<&SqlValue> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// 拼进 VALUES 列表时的文本：字面值用绑定变量，TVP 引用用列表达式。
    pub(crate) fn placeholder<'a>(&'a self, sql_variable_name: &'a str) -> &'a str {
        match self {
            Self::TableColumn(expr) => expr.as_str(),
            _ => sql_variable_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlBuilderEntry<D> {
    pub details: EntryDetails<D>,
    pub is_key: bool,
    pub use_for_insert: bool,
    pub use_for_update: bool,
    pub use_for_read: bool,
    pub is_formal_parameter: bool,
    /// 由子句生成阶段设置；只有被标记的条目才会进入参数列表。
    pub use_parameter: bool,
    pub value: BoundValue,
}

impl<D> SqlBuilderEntry<D> {
    pub fn from_column(column: ColumnMetadata<D>) -> Self {
        let writable = !column.is_computed && !column.is_identity;
        Self {
            is_key: column.is_primary_key,
            use_for_insert: writable,
            use_for_update: writable,
            use_for_read: false,
            is_formal_parameter: false,
            use_parameter: false,
            value: BoundValue::Unset,
            details: EntryDetails::Column(column),
        }
    }

    pub fn from_parameter(parameter: ParameterMetadata<D>) -> Self {
        Self {
            is_key: false,
            use_for_insert: false,
            use_for_update: false,
            use_for_read: false,
            is_formal_parameter: true,
            use_parameter: false,
            value: BoundValue::Unset,
            details: EntryDetails::Parameter(parameter),
        }
    }

    /// 按逻辑名、SQL 名或绑定变量名（可省略前缀）做大小写不敏感匹配。
    pub(crate) fn matches_any_name(&self, name: &str) -> bool {
        let var = self.details.sql_variable_name();
        self.details.name().eq_ignore_ascii_case(name)
            || self.details.sql_name().eq_ignore_ascii_case(name)
            || var.eq_ignore_ascii_case(name)
            || var
                .get(1..)
                .is_some_and(|bare| bare.eq_ignore_ascii_case(name))
    }

    /// 按列名匹配（对象属性映射出的列名、排序列、TVP 列）。
    pub(crate) fn matches_column_name(&self, name: &str) -> bool {
        self.details.sql_name().eq_ignore_ascii_case(name)
            || self.details.name().eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavor::Flavor;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_and_computed_are_not_writable() {
        let id = SqlBuilderEntry::from_column(
            ColumnMetadata::<String>::new("Id", None)
                .primary_key()
                .identity(),
        );
        assert!(id.is_key);
        assert!(!id.use_for_insert && !id.use_for_update);

        let total =
            SqlBuilderEntry::from_column(ColumnMetadata::<String>::new("Total", None).computed());
        assert!(!total.use_for_insert && !total.use_for_update);

        let name = SqlBuilderEntry::from_column(ColumnMetadata::<String>::new("Name", None));
        assert!(name.use_for_insert && name.use_for_update && !name.is_key);
        assert_eq!(name.value, BoundValue::Unset);
    }

    #[test]
    fn unset_is_not_null() {
        assert!(!BoundValue::Unset.is_set());
        assert!(BoundValue::Value(SqlValue::Null).is_set());
        assert_eq!(
            BoundValue::Value(SqlValue::Null).literal(),
            Some(&SqlValue::Null)
        );
        assert_eq!(BoundValue::TableColumn("t.[a]".into()).literal(), None);
    }

    #[test]
    fn parameter_entries_are_formal() {
        let p = SqlBuilderEntry::from_parameter(ParameterMetadata::<String>::for_flavor(
            Flavor::SQLServer,
            "@Id",
            None,
        ));
        assert!(p.is_formal_parameter);
        assert!(!p.details.is_column());
        assert!(p.matches_any_name("id"));
        assert!(p.matches_any_name("@ID"));
    }
}
