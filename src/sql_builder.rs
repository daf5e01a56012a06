//! SqlBuilder：为一张表/视图/存储过程持有定长的条目数组。
//!
//! 一条语句的处理分三步：绑定值 → 生成子句文本（顺带标记参数）→ 生成参数列表。
//! 生成参数列表之前，所有相关的 `build_*` 必须已经调用过，否则尚未引用的列不会出现在参数里。
//!
//! 一个实例只服务一条语句；需要复用部分绑定的状态时，`clone()` 出独立副本再继续绑定。

use crate::entry::{EntryDetails, SqlBuilderEntry};
use crate::error::{BindError, Result};
use crate::metadata::{ColumnMetadata, ParameterMetadata};
use crate::value::SqlValue;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlBuilder<D = String> {
    name: String,
    entries: Vec<SqlBuilderEntry<D>>,
}

impl<D> SqlBuilder<D> {
    /// 表或视图。
    pub fn new(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnMetadata<D>>,
    ) -> Result<Self> {
        Self::with_parameters(name, columns, std::iter::empty())
    }

    /// 存储过程：只有形参。
    pub fn for_procedure(
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = ParameterMetadata<D>>,
    ) -> Result<Self> {
        Self::with_parameters(name, std::iter::empty(), parameters)
    }

    /// 表值函数：结果列在前，形参在后。
    pub fn with_parameters(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = ColumnMetadata<D>>,
        parameters: impl IntoIterator<Item = ParameterMetadata<D>>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(BindError::MissingArgument("name"));
        }
        let entries = columns
            .into_iter()
            .map(SqlBuilderEntry::from_column)
            .chain(parameters.into_iter().map(SqlBuilderEntry::from_parameter))
            .collect();
        Ok(Self { name, entries })
    }

    /// 主体名（表/视图/过程），用于错误信息。
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[SqlBuilderEntry<D>] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [SqlBuilderEntry<D>] {
        &mut self.entries
    }

    /// 按逻辑名、SQL 名或绑定变量名查找条目。
    pub fn try_get_entry(&self, name: &str) -> Option<&SqlBuilderEntry<D>> {
        self.entries.iter().find(|e| e.matches_any_name(name))
    }

    pub fn has_read_fields(&self) -> bool {
        self.entries.iter().any(|e| e.use_for_read)
    }

    /// 标记满足 `pred` 的条目参与参数化，并按声明顺序返回它们。
    ///
    /// 文本与参数由同一个谓词决定，不会出现“拼了列却漏了参数”。
    pub(crate) fn mark_and_collect(
        &mut self,
        pred: impl Fn(&SqlBuilderEntry<D>) -> bool,
    ) -> Vec<&SqlBuilderEntry<D>> {
        for e in self.entries.iter_mut() {
            if pred(&*e) {
                e.use_parameter = true;
            }
        }
        self.entries.iter().filter(|&e| pred(e)).collect()
    }

    /// INSERT 列：`use_for_insert` 且已绑定值（字面值、NULL 或 TVP 列引用）。
    pub fn get_insert_columns(&mut self) -> Vec<&SqlBuilderEntry<D>> {
        self.mark_and_collect(is_insert_column)
    }

    /// UPDATE 列：`use_for_update`、非 key 且绑定了字面值。
    pub fn get_update_columns(&mut self) -> Vec<&SqlBuilderEntry<D>> {
        self.mark_and_collect(is_update_column)
    }

    pub fn get_key_columns(&mut self) -> Vec<&SqlBuilderEntry<D>> {
        self.mark_and_collect(|e| e.is_key)
    }

    /// 所有绑定了字面值的真实列，不看 insert/update 标记（MERGE 的 source 行用得到）。
    pub fn get_parameterized_columns(&mut self) -> Vec<&SqlBuilderEntry<D>> {
        self.mark_and_collect(|e| e.details.is_column() && e.value.literal().is_some())
    }

    pub fn get_formal_parameters(&mut self) -> Vec<&SqlBuilderEntry<D>> {
        self.mark_and_collect(|e| e.is_formal_parameter)
    }

    /// SELECT 列。只读，不标记参数。
    pub fn get_select_columns(&self) -> Vec<&SqlBuilderEntry<D>> {
        self.entries.iter().filter(|e| e.use_for_read).collect()
    }

    /// 生成参数列表：每个 `use_parameter` 且绑定了字面值（含 NULL）的条目交给 `factory` 一次。
    ///
    /// 未绑定或绑定为 TVP 列引用的条目被静默跳过。表值函数的结果列与同名形参共用一个
    /// 绑定变量，只输出先声明的那个。
    pub fn get_parameters<P>(&self, mut factory: impl FnMut(ParameterSource<'_, D>) -> P) -> Vec<P> {
        let mut seen: Vec<&str> = Vec::new();
        self.entries
            .iter()
            .filter(|e| e.use_parameter)
            .filter_map(|e| {
                let value = e.value.literal()?;
                let var = e.details.sql_variable_name();
                if seen.iter().any(|s| s.eq_ignore_ascii_case(var)) {
                    return None;
                }
                seen.push(var);
                Some(factory(ParameterSource {
                    details: &e.details,
                    value,
                }))
            })
            .collect()
    }

    pub(crate) fn mapping_failure(&self, err: BindError) -> BindError {
        #[cfg(feature = "tracing")]
        tracing::debug!(subject = %self.name(), error = %err, "binding failed to map");
        err
    }
}

impl<D: Clone> SqlBuilder<D> {
    /// 执行一次绑定；`f` 返回错误时把条目恢复成调用前的样子。
    pub(crate) fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.entries.clone();
        let out = f(self);
        if out.is_err() {
            self.entries = snapshot;
        }
        out
    }
}

pub(crate) fn is_insert_column<D>(e: &SqlBuilderEntry<D>) -> bool {
    e.use_for_insert && e.value.is_set()
}

pub(crate) fn is_update_column<D>(e: &SqlBuilderEntry<D>) -> bool {
    e.use_for_update && !e.is_key && e.value.literal().is_some()
}

/// `get_parameters` 交给参数工厂的视图。
#[derive(Debug)]
pub struct ParameterSource<'a, D> {
    pub details: &'a EntryDetails<D>,
    pub value: &'a SqlValue,
}

impl<D> Clone for ParameterSource<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for ParameterSource<'_, D> {}

impl<'a, D> ParameterSource<'a, D> {
    /// 绑定变量名，例如 `@Name`。
    pub fn name(&self) -> &'a str {
        self.details.sql_variable_name()
    }

    pub fn db_type(&self) -> Option<&'a D> {
        self.details.db_type()
    }
}

/// 不依赖具体驱动的通用参数对象；`SqlParameter::from_source` 可直接作为参数工厂。
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter<D = String> {
    pub name: String,
    pub value: SqlValue,
    pub db_type: Option<D>,
}

impl<D: Clone> SqlParameter<D> {
    pub fn from_source(source: ParameterSource<'_, D>) -> Self {
        Self {
            name: source.name().to_string(),
            value: source.value.clone(),
            db_type: source.db_type().cloned(),
        }
    }
}
