//! halo-sql-binder：按列元数据绑定参数值、应用审计规则，并生成多方言 SQL 子句片段与参数列表。

pub mod argument;
#[cfg(test)]
mod argument_tests;
pub mod binding;
pub mod clauses;
pub mod entry;
pub mod error;
pub mod field_mapper;
pub mod flavor;
pub mod metadata;
pub mod options;
pub mod rules;
#[cfg(test)]
mod rules_tests;
pub mod sql_builder;
pub mod value;

pub use crate::argument::{
    ArgumentProperty, ArgumentSource, PropertyMeta, SqlArgument, Tracked, object_properties,
};
pub use crate::entry::{BoundValue, EntryDetails, SqlBuilderEntry};
pub use crate::error::{BindError, Result};
pub use crate::field_mapper::{
    FieldMapperFunc, default_field_mapper, identity_mapper, pascal_case_mapper,
    set_default_field_mapper, set_default_field_mapper_scoped, snake_case_mapper,
};
pub use crate::flavor::{Flavor, default_flavor, set_default_flavor, set_default_flavor_scoped};
pub use crate::metadata::{ColumnMetadata, ParameterMetadata};
pub use crate::options::{
    ArgumentOptions, DesiredColumns, FilterOptions, SortDirection, SortExpression,
};
pub use crate::rules::{
    AuditContext, AuditRule, AuditRules, DateTimeRule, OperationKind, OperationTypes,
    SoftDeleteRule, UserDataRule, ValidationError, ValidationErrors, ValidationRule,
};
pub use crate::sql_builder::{ParameterSource, SqlBuilder, SqlParameter};
pub use crate::value::{SqlDateTime, SqlValue};

/// 便捷命名空间：允许 `use halo_binder::prelude::*` 一次导入常用类型。
pub mod prelude {
    pub use crate::*;
}
