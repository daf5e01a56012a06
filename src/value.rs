//! 绑定到列或参数上的 SQL 值。

use std::borrow::Cow;

/// SQL 参数值。`Null` 表示显式绑定的 SQL NULL。
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Cow<'static, str>),
    Bytes(Vec<u8>),
    DateTime(SqlDateTime),
}

/// 带可选时区缩写的时间值。
#[derive(Debug, Clone, PartialEq)]
pub struct SqlDateTime {
    pub dt: time::OffsetDateTime,
    pub tz_abbr: Option<Cow<'static, str>>,
}

impl SqlDateTime {
    pub fn new(dt: time::OffsetDateTime) -> Self {
        Self { dt, tz_abbr: None }
    }

    pub fn with_tz_abbr(mut self, abbr: impl Into<Cow<'static, str>>) -> Self {
        self.tz_abbr = Some(abbr.into());
        self
    }
}

impl SqlValue {
    /// 将 `Option<T>` 映射为 `SqlValue`：`None => Null`，`Some(v) => v.into()`。
    pub fn from_option<T: Into<SqlValue>>(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// “空值”判断，供 `omit_empty` 属性使用：NULL、空串、空字节串、0、false。
    pub fn is_empty_value(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !*b,
            Self::I64(v) => *v == 0,
            Self::U64(v) => *v == 0,
            // 用 bits 判断 0，-0.0 不算空
            Self::F64(v) => v.to_bits() == 0,
            Self::String(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::DateTime(_) => false,
        }
    }
}

impl From<()> for SqlValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

macro_rules! signed_into_value {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::I64(v as i64)
            }
        })+
    };
}

macro_rules! unsigned_into_value {
    ($($t:ty),+ $(,)?) => {
        $(impl From<$t> for SqlValue {
            fn from(v: $t) -> Self {
                Self::U64(v as u64)
            }
        })+
    };
}

signed_into_value!(i8, i16, i32, i64);
unsigned_into_value!(u8, u16, u32, u64);

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        Self::F64(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::String(Cow::Owned(v))
    }
}

impl From<&'static str> for SqlValue {
    fn from(v: &'static str) -> Self {
        Self::String(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<time::OffsetDateTime> for SqlValue {
    fn from(v: time::OffsetDateTime) -> Self {
        Self::DateTime(SqlDateTime::new(v))
    }
}

impl From<SqlDateTime> for SqlValue {
    fn from(v: SqlDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        Self::from_option(v)
    }
}
