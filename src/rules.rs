//! 审计规则：按列名与操作类型注入/覆盖值、强制列参与语句，或在绑定前校验整个参数对象。

use crate::argument::ArgumentSource;
use crate::error::{BindError, Result};
use crate::value::SqlValue;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

/// 一次绑定所针对的操作。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    Select,
}

/// 规则生效的操作集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OperationTypes(u8);

impl OperationTypes {
    pub const NONE: Self = Self(0);
    pub const INSERT: Self = Self(1);
    pub const UPDATE: Self = Self(1 << 1);
    pub const DELETE: Self = Self(1 << 2);
    pub const SELECT: Self = Self(1 << 3);
    pub const INSERT_OR_UPDATE: Self = Self(Self::INSERT.0 | Self::UPDATE.0);

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn includes(self, operation: OperationKind) -> bool {
        self.contains(operation.into())
    }
}

impl BitOr for OperationTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<OperationKind> for OperationTypes {
    fn from(v: OperationKind) -> Self {
        match v {
            OperationKind::Insert => Self::INSERT,
            OperationKind::Update => Self::UPDATE,
            OperationKind::Delete => Self::DELETE,
            OperationKind::Select => Self::SELECT,
        }
    }
}

/// 单个字段的校验失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub property: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// 一组校验失败。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, property: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::new(property, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// 没有错误时返回 `Ok(())`。
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.property, e.message)?;
        }
        Ok(())
    }
}

/// 审计规则。
pub trait AuditRule: dyn_clone::DynClone + fmt::Debug + Send + Sync {
    fn applies_when(&self) -> OperationTypes;

    /// 列规则作用的列名；校验类规则返回 `None`。
    fn column_name(&self) -> Option<&str> {
        None
    }

    fn matches(&self, column: &str, operation: OperationKind) -> bool {
        self.applies_when().includes(operation)
            && self
                .column_name()
                .is_some_and(|c| c.eq_ignore_ascii_case(column))
    }

    /// 在逐列处理之前校验整个参数对象；列规则也可以覆盖。返回错误会中止本次操作。
    fn check_argument(
        &self,
        _argument: Option<&dyn ArgumentSource>,
        _operation: OperationKind,
    ) -> Result<()> {
        Ok(())
    }

    /// 计算列的新值；默认保留原值。
    fn generate_value(
        &self,
        _argument: Option<&dyn ArgumentSource>,
        _user: Option<&dyn ArgumentSource>,
        current: Option<&SqlValue>,
    ) -> Result<Option<SqlValue>> {
        Ok(current.cloned())
    }

    fn as_soft_delete(&self) -> Option<&SoftDeleteRule> {
        None
    }
}

dyn_clone::clone_trait_object!(AuditRule);

type Clock = fn() -> time::OffsetDateTime;

/// 写入当前时间，例如 `CreatedDate`（Insert）或 `UpdatedAt`（Update）。
#[derive(Debug, Clone)]
pub struct DateTimeRule {
    column: String,
    applies_when: OperationTypes,
    offset: time::UtcOffset,
    clock: Clock,
}

impl DateTimeRule {
    pub fn new(column: impl Into<String>, applies_when: OperationTypes) -> Self {
        Self {
            column: column.into(),
            applies_when,
            offset: time::UtcOffset::UTC,
            clock: time::OffsetDateTime::now_utc,
        }
    }

    /// 以固定偏移输出时间（默认 UTC）。
    pub fn with_offset(mut self, offset: time::UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl AuditRule for DateTimeRule {
    fn applies_when(&self) -> OperationTypes {
        self.applies_when
    }

    fn column_name(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn generate_value(
        &self,
        _argument: Option<&dyn ArgumentSource>,
        _user: Option<&dyn ArgumentSource>,
        _current: Option<&SqlValue>,
    ) -> Result<Option<SqlValue>> {
        Ok(Some((self.clock)().to_offset(self.offset).into()))
    }
}

/// 软删除：Delete 时写入“已删除”标记值；Select 时由 `build_soft_delete_clause` 排除已删除行。
#[derive(Debug, Clone)]
pub struct SoftDeleteRule {
    column: String,
    deleted_value: SqlValue,
    applies_when: OperationTypes,
}

impl SoftDeleteRule {
    pub fn new(column: impl Into<String>, deleted_value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            deleted_value: deleted_value.into(),
            applies_when: OperationTypes::DELETE | OperationTypes::SELECT,
        }
    }

    pub fn with_applies_when(mut self, applies_when: OperationTypes) -> Self {
        self.applies_when = applies_when;
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn deleted_value(&self) -> &SqlValue {
        &self.deleted_value
    }
}

impl AuditRule for SoftDeleteRule {
    fn applies_when(&self) -> OperationTypes {
        self.applies_when
    }

    fn column_name(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn generate_value(
        &self,
        _argument: Option<&dyn ArgumentSource>,
        _user: Option<&dyn ArgumentSource>,
        _current: Option<&SqlValue>,
    ) -> Result<Option<SqlValue>> {
        Ok(Some(self.deleted_value.clone()))
    }

    fn as_soft_delete(&self) -> Option<&SoftDeleteRule> {
        Some(self)
    }
}

/// 从用户上下文读取一个属性写入列，例如 `CreatedBy <- user.user_key`。
#[derive(Debug, Clone)]
pub struct UserDataRule {
    column: String,
    property: String,
    applies_when: OperationTypes,
}

impl UserDataRule {
    pub fn new(
        column: impl Into<String>,
        property: impl Into<String>,
        applies_when: OperationTypes,
    ) -> Self {
        Self {
            column: column.into(),
            property: property.into(),
            applies_when,
        }
    }
}

impl AuditRule for UserDataRule {
    fn applies_when(&self) -> OperationTypes {
        self.applies_when
    }

    fn column_name(&self) -> Option<&str> {
        Some(&self.column)
    }

    fn generate_value(
        &self,
        _argument: Option<&dyn ArgumentSource>,
        user: Option<&dyn ArgumentSource>,
        _current: Option<&SqlValue>,
    ) -> Result<Option<SqlValue>> {
        let user = user.ok_or(BindError::MissingArgument("user"))?;
        let value = user.property_value(&self.property).ok_or_else(|| {
            BindError::invalid_argument(
                "user",
                format!("user context has no property `{}`", self.property),
            )
        })?;
        Ok(Some(value))
    }
}

type ValidateFn =
    Arc<dyn Fn(&dyn ArgumentSource) -> std::result::Result<(), ValidationErrors> + Send + Sync>;

/// 在绑定前校验参数对象。
#[derive(Clone)]
pub struct ValidationRule {
    applies_when: OperationTypes,
    validate: ValidateFn,
}

impl ValidationRule {
    pub fn new(
        applies_when: OperationTypes,
        validate: impl Fn(&dyn ArgumentSource) -> std::result::Result<(), ValidationErrors>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            applies_when,
            validate: Arc::new(validate),
        }
    }
}

impl fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 校验闭包无法 Debug
        f.debug_struct("ValidationRule")
            .field("applies_when", &self.applies_when)
            .finish()
    }
}

impl AuditRule for ValidationRule {
    fn applies_when(&self) -> OperationTypes {
        self.applies_when
    }

    fn check_argument(
        &self,
        argument: Option<&dyn ArgumentSource>,
        operation: OperationKind,
    ) -> Result<()> {
        if !self.applies_when.includes(operation) {
            return Ok(());
        }
        match argument {
            Some(a) => (self.validate)(a).map_err(Into::into),
            None => Ok(()),
        }
    }
}

/// 有序的规则集合。
#[derive(Debug, Clone, Default)]
pub struct AuditRules {
    rules: Vec<Box<dyn AuditRule>>,
}

impl AuditRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: impl AuditRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn push(&mut self, rule: Box<dyn AuditRule>) {
        self.rules.push(rule);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn AuditRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn column_rules_for<'a>(
        &'a self,
        column: &'a str,
        operation: OperationKind,
    ) -> impl Iterator<Item = &'a dyn AuditRule> + 'a {
        self.iter().filter(move |r| r.matches(column, operation))
    }

    /// 对 `operation` 生效的全部规则，列规则与校验规则都在内。
    pub fn rules_for(&self, operation: OperationKind) -> impl Iterator<Item = &dyn AuditRule> {
        self.iter()
            .filter(move |r| r.applies_when().includes(operation))
    }

    pub fn soft_delete_rules_for(
        &self,
        operation: OperationKind,
    ) -> impl Iterator<Item = &SoftDeleteRule> {
        self.iter()
            .filter(move |r| r.applies_when().includes(operation))
            .filter_map(|r| r.as_soft_delete())
    }
}

/// 一次绑定调用可见的规则与用户上下文。
#[derive(Clone, Copy)]
pub struct AuditContext<'a> {
    pub rules: &'a AuditRules,
    pub user: Option<&'a dyn ArgumentSource>,
}

impl<'a> AuditContext<'a> {
    pub fn new(rules: &'a AuditRules) -> Self {
        Self { rules, user: None }
    }

    pub fn with_user(mut self, user: &'a dyn ArgumentSource) -> Self {
        self.user = Some(user);
        self
    }
}

impl fmt::Debug for AuditContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditContext")
            .field("rules", &self.rules)
            .field("has_user", &self.user.is_some())
            .finish()
    }
}
