//! 列与参数元数据：由外部元数据缓存提供，长期存活且不可变。

use crate::flavor::{Flavor, default_flavor};

/// 表/视图的一列。
///
/// 四种名字形式：
/// - `name`：逻辑名（对象属性名），默认等于 `sql_name`
/// - `sql_name`：数据库里的原始列名
/// - `quoted_sql_name`：拼进 SQL 文本时使用的形式
/// - `sql_variable_name`：绑定变量名（如 `@Name`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata<D = String> {
    pub name: String,
    pub sql_name: String,
    pub quoted_sql_name: String,
    pub sql_variable_name: String,
    /// 方言相关的类型标记，参数工厂会用它设置驱动侧的原生类型。
    pub db_type: Option<D>,
    pub is_primary_key: bool,
    pub is_identity: bool,
    pub is_computed: bool,
}

impl<D> ColumnMetadata<D> {
    /// 不加引号的列；绑定变量语法取自 `default_flavor()`。
    pub fn new(sql_name: impl Into<String>, db_type: Option<D>) -> Self {
        let sql_name = sql_name.into();
        Self {
            name: sql_name.clone(),
            quoted_sql_name: sql_name.clone(),
            sql_variable_name: default_flavor().bind_variable(&sql_name),
            sql_name,
            db_type,
            is_primary_key: false,
            is_identity: false,
            is_computed: false,
        }
    }

    /// 按方言生成带引号的列名与绑定变量名。
    pub fn for_flavor(flavor: Flavor, sql_name: impl Into<String>, db_type: Option<D>) -> Self {
        let sql_name = sql_name.into();
        Self {
            name: sql_name.clone(),
            quoted_sql_name: flavor.quote(&sql_name),
            sql_variable_name: flavor.bind_variable(&sql_name),
            sql_name,
            db_type,
            is_primary_key: false,
            is_identity: false,
            is_computed: false,
        }
    }

    /// 覆盖逻辑名（当对象属性名与列名不同）。
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.is_computed = true;
        self
    }
}

/// 存储过程/函数的形参。没有 key/identity/computed 标记。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMetadata<D = String> {
    pub name: String,
    pub sql_name: String,
    pub quoted_sql_name: String,
    pub sql_variable_name: String,
    pub db_type: Option<D>,
}

impl<D> ParameterMetadata<D> {
    /// 参数名可以带前缀（`@id`）也可以不带；逻辑名总是去掉前缀后的部分。
    pub fn new(sql_name: impl Into<String>, db_type: Option<D>) -> Self {
        Self::for_flavor(default_flavor(), sql_name, db_type)
    }

    pub fn for_flavor(flavor: Flavor, sql_name: impl Into<String>, db_type: Option<D>) -> Self {
        let sql_name = sql_name.into();
        let bare = sql_name
            .strip_prefix(flavor.bind_prefix())
            .unwrap_or(&sql_name)
            .to_string();
        Self {
            sql_variable_name: flavor.bind_variable(&bare),
            quoted_sql_name: sql_name.clone(),
            name: bare,
            sql_name,
            db_type,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavor::set_default_flavor_scoped;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_column_names() {
        let _g = set_default_flavor_scoped(Flavor::SQLServer);
        let c = ColumnMetadata::<String>::new("First Name", None);
        assert_eq!(c.name, "First Name");
        assert_eq!(c.quoted_sql_name, "First Name");
        assert_eq!(c.sql_variable_name, "@First_Name");
        assert!(!c.is_primary_key);
    }

    #[test]
    fn flavored_column_names() {
        let c = ColumnMetadata::for_flavor(Flavor::PostgreSQL, "id", Some("int4"))
            .with_name("Id")
            .primary_key()
            .identity();
        assert_eq!(c.name, "Id");
        assert_eq!(c.quoted_sql_name, "\"id\"");
        assert_eq!(c.sql_variable_name, "@id");
        assert_eq!(c.db_type, Some("int4"));
        assert!(c.is_primary_key && c.is_identity && !c.is_computed);
    }

    #[test]
    fn parameter_strips_prefix() {
        let p = ParameterMetadata::<String>::for_flavor(Flavor::SQLServer, "@CustomerKey", None);
        assert_eq!(p.name, "CustomerKey");
        assert_eq!(p.sql_name, "@CustomerKey");
        assert_eq!(p.sql_variable_name, "@CustomerKey");
    }
}
