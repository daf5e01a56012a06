//! Field mapper：把 Rust 字段名映射为列名。
//!
//! `sql_argument!` 中没有显式 `column:` 的属性，在绑定时用当前默认 mapper 求列名。

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// 字段名映射函数类型。
pub type FieldMapperFunc = Arc<dyn Fn(&str) -> String + Send + Sync + 'static>;

fn identity_impl(s: &str) -> String {
    s.to_string()
}

static IDENTITY_MAPPER: OnceLock<FieldMapperFunc> = OnceLock::new();

/// 恒等 mapper（默认值）。
pub fn identity_mapper() -> FieldMapperFunc {
    IDENTITY_MAPPER
        .get_or_init(|| Arc::new(identity_impl))
        .clone()
}

static DEFAULT_FIELD_MAPPER: OnceLock<Mutex<FieldMapperFunc>> = OnceLock::new();
static DEFAULT_FIELD_MAPPER_LOCK: Mutex<()> = Mutex::new(());

fn mapper_cell() -> &'static Mutex<FieldMapperFunc> {
    DEFAULT_FIELD_MAPPER.get_or_init(|| Mutex::new(identity_mapper()))
}

/// 获取当前全局默认 FieldMapper。
pub fn default_field_mapper() -> FieldMapperFunc {
    mapper_cell()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// 设置全局默认 FieldMapper，返回旧值。
pub fn set_default_field_mapper(mapper: FieldMapperFunc) -> FieldMapperFunc {
    let mut g = mapper_cell().lock().unwrap_or_else(|e| e.into_inner());
    std::mem::replace(&mut *g, mapper)
}

/// 修改全局默认 FieldMapper 的 RAII guard（会持有一个全局锁，避免并行测试互相干扰）。
pub struct DefaultFieldMapperGuard {
    _lock: MutexGuard<'static, ()>,
    old: FieldMapperFunc,
}

impl Drop for DefaultFieldMapperGuard {
    fn drop(&mut self) {
        let _ = set_default_field_mapper(self.old.clone());
    }
}

/// 在一个作用域内临时设置默认 FieldMapper，并保证退出作用域后自动恢复。
pub fn set_default_field_mapper_scoped(mapper: FieldMapperFunc) -> DefaultFieldMapperGuard {
    let lock = DEFAULT_FIELD_MAPPER_LOCK
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let old = set_default_field_mapper(mapper);
    DefaultFieldMapperGuard { _lock: lock, old }
}

/// SnakeCaseMapper：`CamelCase` => `snake_case`。
///
/// 规则子集：大写转小写；在 `aB`/`a1B`/`ABc` 这类单词边界插入 `_`。
pub fn snake_case_mapper(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut prev: Option<char> = None;
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();

        if c.is_ascii_uppercase() {
            if let Some(p) = prev {
                let prev_is_lower_or_digit = p.is_ascii_lowercase() || p.is_ascii_digit();
                let next_is_lower = next.map(|n| n.is_ascii_lowercase()).unwrap_or(false);

                if prev_is_lower_or_digit || (p.is_ascii_uppercase() && next_is_lower) {
                    out.push('_');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }

        prev = Some(c);
    }

    out
}

/// PascalCaseMapper：`snake_case` => `PascalCase`，用于 Rust 字段对接 `UpdatedAt` 这类列名。
pub fn pascal_case_mapper(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars);
        }
    }
    out
}
