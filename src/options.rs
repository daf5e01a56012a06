//! 每次绑定调用显式传入的选项，以及列选择、排序表达式。

/// `apply_argument_value` 的选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArgumentOptions {
    /// 严格模式：任一属性匹配不到列即报错。
    pub strict: bool,
    /// 以参数对象自己的 key 标记代替表主键。
    pub use_object_defined_keys: bool,
    /// 只把变更集中的属性用于 UPDATE。
    pub changed_properties_only: bool,
    /// UPDATE 实际是软删除：规则按 Delete 查找。
    pub soft_delete: bool,
}

impl ArgumentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn use_object_defined_keys(mut self, v: bool) -> Self {
        self.use_object_defined_keys = v;
        self
    }

    pub fn changed_properties_only(mut self, v: bool) -> Self {
        self.changed_properties_only = v;
        self
    }

    pub fn soft_delete(mut self, v: bool) -> Self {
        self.soft_delete = v;
        self
    }
}

/// `apply_filter_value` 的选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub strict: bool,
    /// 跳过值为 NULL 的属性，而不是生成 `IS NULL`。
    pub ignore_null_properties: bool,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn ignore_null_properties(mut self, v: bool) -> Self {
        self.ignore_null_properties = v;
        self
    }
}

/// 读取哪些列。三个哨兵值加显式列表，调用方按变体分支。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredColumns {
    /// 不读任何列。
    NoColumns,
    /// 主键列；没有主键时退回 identity 列。
    Auto,
    /// 所有真实列（不含纯形参）。
    All,
    /// 按逻辑名或 SQL 名指定。
    Named(Vec<String>),
}

impl DesiredColumns {
    pub fn named(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Named(names.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// ORDER BY 的一项：列名加方向，或原样拼入的表达式。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortExpression {
    Column {
        name: String,
        direction: SortDirection,
    },
    Raw(String),
}

impl SortExpression {
    pub fn asc(name: impl Into<String>) -> Self {
        Self::Column {
            name: name.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self::Column {
            name: name.into(),
            direction: SortDirection::Descending,
        }
    }

    /// 不做列名校验，原样拼入 ORDER BY。
    pub fn raw(expr: impl Into<String>) -> Self {
        Self::Raw(expr.into())
    }
}

impl From<&str> for SortExpression {
    fn from(v: &str) -> Self {
        Self::asc(v)
    }
}

impl From<(&str, SortDirection)> for SortExpression {
    fn from((name, direction): (&str, SortDirection)) -> Self {
        Self::Column {
            name: name.to_string(),
            direction,
        }
    }
}
