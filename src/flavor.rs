//! SQL Flavor（方言）：控制标识符 Quote 与绑定变量语法。

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

/// 引擎支持的方言。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flavor {
    #[default]
    SQLServer,
    PostgreSQL,
    MySQL,
    SQLite,
    Oracle,
}

static DEFAULT_FLAVOR: AtomicU8 = AtomicU8::new(Flavor::SQLServer as u8);
static DEFAULT_FLAVOR_LOCK: Mutex<()> = Mutex::new(());

impl Flavor {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::SQLServer,
            1 => Self::PostgreSQL,
            2 => Self::MySQL,
            3 => Self::SQLite,
            4 => Self::Oracle,
            _ => Self::SQLServer,
        }
    }

    fn to_u8(self) -> u8 {
        self as u8
    }
}

/// 获取当前全局默认 Flavor。
pub fn default_flavor() -> Flavor {
    Flavor::from_u8(DEFAULT_FLAVOR.load(Ordering::Relaxed))
}

/// 设置全局默认 Flavor，返回旧值。
pub fn set_default_flavor(flavor: Flavor) -> Flavor {
    let old = DEFAULT_FLAVOR.swap(flavor.to_u8(), Ordering::Relaxed);
    Flavor::from_u8(old)
}

/// 修改全局默认 Flavor 的 RAII guard（会持有一个全局锁，避免并行测试互相干扰）。
pub struct DefaultFlavorGuard {
    _lock: MutexGuard<'static, ()>,
    old: Flavor,
}

impl Drop for DefaultFlavorGuard {
    fn drop(&mut self) {
        set_default_flavor(self.old);
    }
}

/// 在一个作用域内临时设置 DefaultFlavor，并保证退出作用域后自动恢复。
pub fn set_default_flavor_scoped(flavor: Flavor) -> DefaultFlavorGuard {
    let lock = DEFAULT_FLAVOR_LOCK
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let old = set_default_flavor(flavor);
    DefaultFlavorGuard { _lock: lock, old }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SQLServer => "SQLServer",
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
            Self::Oracle => "Oracle",
        };
        f.write_str(s)
    }
}

impl Flavor {
    /// 为标识符加引号；标识符内部出现的结束引号会被转义。
    pub fn quote(self, name: &str) -> String {
        match self {
            Self::SQLServer => format!("[{}]", name.replace(']', "]]")),
            Self::MySQL => format!("`{}`", name.replace('`', "``")),
            Self::PostgreSQL | Self::SQLite | Self::Oracle => {
                format!("\"{}\"", name.replace('"', "\"\""))
            }
        }
    }

    /// 绑定变量前缀。
    pub fn bind_prefix(self) -> char {
        match self {
            Self::Oracle => ':',
            _ => '@',
        }
    }

    /// 由列名/参数名生成绑定变量名，例如 `First Name` => `@First_Name`。
    ///
    /// 已带前缀的名字（如存储过程参数 `@id`）原样保留。
    pub fn bind_variable(self, name: &str) -> String {
        let prefix = self.bind_prefix();
        let bare = name.strip_prefix(prefix).unwrap_or(name);
        let mut out = String::with_capacity(bare.len() + 1);
        out.push(prefix);
        for c in bare.chars() {
            if c.is_alphanumeric() || c == '_' {
                out.push(c);
            } else {
                out.push('_');
            }
        }
        out
    }
}
