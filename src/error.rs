//! 绑定与子句生成过程中的错误类型。

use crate::rules::ValidationErrors;

pub type Result<T> = std::result::Result<T, BindError>;

/// 调用意图与表结构不匹配时同步抛出；引擎内部不做重试。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("binder mapping error: no properties of the argument matched a column of {subject}")]
    NoMatchingProperties { subject: String },

    #[error("binder mapping error: the argument declares no key property matching {subject}")]
    NoMatchingKeys { subject: String },

    #[error("binder mapping error: property `{property}` has no matching column on {subject}")]
    UnmatchedProperty { subject: String, property: String },

    #[error("binder mapping error: column `{column}` was not found on {subject}")]
    UnmatchedColumn { subject: String, column: String },

    #[error("binder mapping error: no primary key or identity column found on {subject}")]
    NoPrimaryKey { subject: String },

    #[error("binder mapping error: cannot sort {subject} by unknown column `{column}`")]
    UnknownSortColumn { subject: String, column: String },

    #[error("binder mapping error: no table type column matched a column of {subject}")]
    NoMatchingTableTypeColumns { subject: String },

    #[error("binder invalid argument `{argument}`: {message}")]
    InvalidArgument {
        argument: &'static str,
        message: String,
    },

    #[error("binder argument `{0}` is required")]
    MissingArgument(&'static str),

    #[error("binder validation failed: {0}")]
    Validation(ValidationErrors),
}

impl BindError {
    pub fn invalid_argument(argument: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            message: message.into(),
        }
    }

    /// 是否属于“映射错误”（名字对不上列）。
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self,
            Self::NoMatchingProperties { .. }
                | Self::NoMatchingKeys { .. }
                | Self::UnmatchedProperty { .. }
                | Self::UnmatchedColumn { .. }
                | Self::NoPrimaryKey { .. }
                | Self::UnknownSortColumn { .. }
                | Self::NoMatchingTableTypeColumns { .. }
        )
    }
}

impl From<ValidationErrors> for BindError {
    fn from(v: ValidationErrors) -> Self {
        Self::Validation(v)
    }
}
