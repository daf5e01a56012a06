//! 参数来源：对象（`sql_argument!` 生成的属性元数据）、字符串键的 map、以及带变更集的 `Tracked<T>`。
//!
//! Rust 无运行时反射；对象路径通过 `macro_rules!` 为 struct 生成属性元数据与取值逻辑，
//! 绑定引擎只依赖 object-safe 的 [`ArgumentSource`]。

use crate::field_mapper::default_field_mapper;
use crate::value::SqlValue;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// 单个属性的静态元数据，由 `sql_argument!` 生成。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyMeta {
    /// Rust 字段名
    pub rust: &'static str,
    /// 列名；空串表示交给默认 FieldMapper 推导
    pub column: &'static str,
    pub key: bool,
    pub ignore: bool,
    pub ignore_on_insert: bool,
    pub ignore_on_update: bool,
    /// 值为空（见 `SqlValue::is_empty_value`）时不绑定
    pub omit_empty: bool,
}

impl PropertyMeta {
    pub const fn new(rust: &'static str, column: &'static str) -> Self {
        Self {
            rust,
            column,
            key: false,
            ignore: false,
            ignore_on_insert: false,
            ignore_on_update: false,
            omit_empty: false,
        }
    }

    pub const fn key(mut self) -> Self {
        self.key = true;
        self
    }

    pub const fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub const fn ignore_on_insert(mut self) -> Self {
        self.ignore_on_insert = true;
        self
    }

    pub const fn ignore_on_update(mut self) -> Self {
        self.ignore_on_update = true;
        self
    }

    pub const fn omit_empty(mut self) -> Self {
        self.omit_empty = true;
        self
    }

    fn column_name(&self) -> String {
        if !self.column.is_empty() {
            return self.column.to_string();
        }
        let mapped = default_field_mapper()(self.rust);
        if mapped.is_empty() {
            self.rust.to_string()
        } else {
            mapped
        }
    }
}

/// 绑定时看到的一条属性：名字、对应列名、当前值与标记。
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentProperty {
    pub name: String,
    pub column: String,
    pub value: SqlValue,
    pub is_key: bool,
    pub ignore_on_insert: bool,
    pub ignore_on_update: bool,
    pub omit_empty: bool,
}

impl ArgumentProperty {
    /// map 条目：名字即列名，没有任何标记。
    pub fn entry(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            value: value.into(),
            is_key: false,
            ignore_on_insert: false,
            ignore_on_update: false,
            omit_empty: false,
        }
    }

    /// `omit_empty` 且值为空时，属性算作匹配但不绑定值。
    pub(crate) fn is_omitted(&self) -> bool {
        self.omit_empty && self.value.is_empty_value()
    }
}

/// 绑定引擎可消费的参数对象。
pub trait ArgumentSource {
    /// map 路径按键名匹配逻辑名/SQL 名/绑定变量名；对象路径按列名匹配。
    fn is_map(&self) -> bool {
        false
    }

    fn properties(&self) -> Vec<ArgumentProperty>;

    /// 变更跟踪：`None` 表示该对象不支持变更跟踪。
    fn changed_properties(&self) -> Option<Vec<String>> {
        None
    }

    /// 按属性名或列名取值（大小写不敏感），供 `UserDataRule` 读取用户上下文。
    fn property_value(&self, name: &str) -> Option<SqlValue> {
        self.properties()
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(name) || p.column.eq_ignore_ascii_case(name))
            .map(|p| p.value)
    }
}

/// 由 `sql_argument!` 为业务 struct 实现：提供属性元数据与取值。
pub trait SqlArgument {
    const PROPERTIES: &'static [PropertyMeta];

    /// 按 `PROPERTIES` 顺序取值。
    fn values(&self) -> Vec<SqlValue>;
}

/// 把静态元数据与取值拼成 `ArgumentProperty` 列表（跳过 `ignore` 属性）。
pub fn object_properties(metas: &[PropertyMeta], values: Vec<SqlValue>) -> Vec<ArgumentProperty> {
    metas
        .iter()
        .zip(values)
        .filter(|(meta, _)| !meta.ignore)
        .map(|(meta, value)| ArgumentProperty {
            name: meta.rust.to_string(),
            column: meta.column_name(),
            value,
            is_key: meta.key,
            ignore_on_insert: meta.ignore_on_insert,
            ignore_on_update: meta.ignore_on_update,
            omit_empty: meta.omit_empty,
        })
        .collect()
}

impl<K, V, S> ArgumentSource for HashMap<K, V, S>
where
    K: AsRef<str>,
    V: Clone + Into<SqlValue>,
    S: BuildHasher,
{
    fn is_map(&self) -> bool {
        true
    }

    fn properties(&self) -> Vec<ArgumentProperty> {
        self.iter()
            .map(|(k, v)| ArgumentProperty::entry(k.as_ref(), v.clone()))
            .collect()
    }
}

impl<K, V> ArgumentSource for BTreeMap<K, V>
where
    K: AsRef<str>,
    V: Clone + Into<SqlValue>,
{
    fn is_map(&self) -> bool {
        true
    }

    fn properties(&self) -> Vec<ArgumentProperty> {
        self.iter()
            .map(|(k, v)| ArgumentProperty::entry(k.as_ref(), v.clone()))
            .collect()
    }
}

/// 显式变更集包装：调用方通过 `update`/`mark_changed` 记录改动过的属性。
#[derive(Debug, Clone, Default)]
pub struct Tracked<T> {
    inner: T,
    changed: Vec<String>,
}

impl<T> Tracked<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            changed: Vec::new(),
        }
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn mark_changed(&mut self, property: impl Into<String>) -> &mut Self {
        let property = property.into();
        if !self.is_changed(&property) {
            self.changed.push(property);
        }
        self
    }

    /// 修改对象并把 `property` 记入变更集。
    pub fn update(&mut self, property: impl Into<String>, f: impl FnOnce(&mut T)) -> &mut Self {
        f(&mut self.inner);
        self.mark_changed(property)
    }

    pub fn is_changed(&self, property: &str) -> bool {
        self.changed
            .iter()
            .any(|c| c.eq_ignore_ascii_case(property))
    }

    /// 清空变更集（例如保存成功之后）。
    pub fn accept_changes(&mut self) {
        self.changed.clear();
    }
}

impl<T: ArgumentSource> ArgumentSource for Tracked<T> {
    fn is_map(&self) -> bool {
        self.inner.is_map()
    }

    fn properties(&self) -> Vec<ArgumentProperty> {
        self.inner.properties()
    }

    fn changed_properties(&self) -> Option<Vec<String>> {
        Some(self.changed.clone())
    }
}

/// 声明一个可作为绑定参数的业务 struct。
///
/// 每个字段写 `column:`（空串表示用默认 FieldMapper 推导），可选 `flags:`，
/// 取值为 `key`、`ignore`、`ignore_on_insert`、`ignore_on_update`、`omit_empty`。
///
/// ```ignore
/// #[derive(Clone)]
/// struct Customer { id: i64, name: String, updated_at: Option<time::OffsetDateTime> }
///
/// halo_binder::sql_argument! {
///     impl Customer {
///         id: { column: "Id", flags: [key] },
///         name: { column: "Name" },
///         updated_at: { column: "UpdatedAt", flags: [omit_empty] },
///     }
/// }
/// ```
#[macro_export]
macro_rules! sql_argument {
    (
        impl $ty:ty {
            $(
                $field:ident : { column: $column:literal $(, flags: [ $($flag:ident),* $(,)? ])? }
            ),* $(,)?
        }
    ) => {
        impl $crate::argument::SqlArgument for $ty {
            const PROPERTIES: &'static [$crate::argument::PropertyMeta] = &[
                $(
                    $crate::argument::PropertyMeta::new(stringify!($field), $column)
                        $($(.$flag())*)?
                ),*
            ];

            fn values(&self) -> Vec<$crate::value::SqlValue> {
                vec![
                    $(
                        $crate::value::SqlValue::from(self.$field.clone())
                    ),*
                ]
            }
        }

        impl $crate::argument::ArgumentSource for $ty {
            fn properties(&self) -> Vec<$crate::argument::ArgumentProperty> {
                $crate::argument::object_properties(
                    <$ty as $crate::argument::SqlArgument>::PROPERTIES,
                    <$ty as $crate::argument::SqlArgument>::values(self),
                )
            }
        }
    };
}
