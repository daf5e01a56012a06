//! 子句生成：把条目拼成 SQL 片段追加到调用方的缓冲区，并标记被引用条目参与参数化。
//!
//! `header`/`footer` 原样拼在片段前后，传空串即不拼。引擎只产出片段；
//! `build_*_statement` 是几种常见组合的简写。

use crate::entry::{BoundValue, SqlBuilderEntry};
use crate::error::{BindError, Result};
use crate::options::{SortDirection, SortExpression};
use crate::rules::{AuditContext, OperationKind};
use crate::sql_builder::{SqlBuilder, is_insert_column, is_update_column};

fn write_list(sql: &mut String, header: &str, items: &[String], footer: &str) {
    sql.push_str(header);
    sql.push_str(&items.join(", "));
    sql.push_str(footer);
}

fn quoted_names<D>(entries: &[&SqlBuilderEntry<D>]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.details.quoted_sql_name().to_string())
        .collect()
}

fn assignments<D>(entries: &[&SqlBuilderEntry<D>]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            format!(
                "{} = {}",
                e.details.quoted_sql_name(),
                e.details.sql_variable_name()
            )
        })
        .collect()
}

impl<D> SqlBuilder<D> {
    /// INSERT 的列清单，例如 `header="INSERT INTO t ("`、`footer=")"`。
    pub fn build_insert_clause(&mut self, sql: &mut String, header: &str, footer: &str) {
        let cols = quoted_names(&self.get_insert_columns());
        write_list(sql, header, &cols, footer);
    }

    /// 与 `build_insert_clause` 同序的值清单：字面值用绑定变量，TVP 引用用列名。
    pub fn build_values_clause(&mut self, sql: &mut String, header: &str, footer: &str) {
        let values: Vec<String> = self
            .get_insert_columns()
            .iter()
            .map(|e| {
                e.value
                    .placeholder(e.details.sql_variable_name())
                    .to_string()
            })
            .collect();
        write_list(sql, header, &values, footer);
    }

    /// `INSERT INTO t (a, b) VALUES (@a, @b)`；没有可插入列时输出 `DEFAULT VALUES`。
    pub fn build_insert_statement(&mut self, sql: &mut String, table: &str, footer: &str) {
        if !self.entries().iter().any(is_insert_column) {
            sql.push_str(&format!("INSERT INTO {table} DEFAULT VALUES"));
            sql.push_str(footer);
            return;
        }
        self.build_insert_clause(sql, &format!("INSERT INTO {table} ("), ")");
        self.build_values_clause(sql, " VALUES (", ")");
        sql.push_str(footer);
    }

    /// `a = @a, b = @b`：可更新、非 key 且绑定了字面值的列。
    pub fn build_set_clause(&mut self, sql: &mut String, header: &str, footer: &str) {
        let items = assignments(&self.get_update_columns());
        write_list(sql, header, &items, footer);
    }

    /// `k1 = @k1 AND k2 = @k2`，按 key 列声明顺序。
    pub fn build_where_clause(&mut self, sql: &mut String, header: &str, footer: &str) {
        let items = assignments(&self.get_key_columns());
        sql.push_str(header);
        sql.push_str(&items.join(" AND "));
        sql.push_str(footer);
    }

    /// `UPDATE t SET ... WHERE ...`。没有可更新列或没有 key 时报错，避免生成无效或全表的 UPDATE。
    pub fn build_update_by_key_statement(
        &mut self,
        sql: &mut String,
        table: &str,
        footer: &str,
    ) -> Result<()> {
        self.require_keys()?;
        if !self.entries().iter().any(is_update_column) {
            return Err(self.mapping_failure(BindError::NoMatchingProperties {
                subject: self.name().to_string(),
            }));
        }
        self.build_set_clause(sql, &format!("UPDATE {table} SET "), "");
        self.build_where_clause(sql, " WHERE ", footer);
        Ok(())
    }

    /// `DELETE FROM t WHERE ...`。
    pub fn build_delete_statement(&mut self, sql: &mut String, table: &str, footer: &str) -> Result<()> {
        self.require_keys()?;
        self.build_where_clause(sql, &format!("DELETE FROM {table} WHERE "), footer);
        Ok(())
    }

    /// 读取列清单；没有标记读取的列时什么都不输出（包括 header/footer）。不标记参数。
    pub fn build_select_clause(
        &self,
        sql: &mut String,
        header: &str,
        table_alias: Option<&str>,
        footer: &str,
    ) {
        let cols: Vec<String> = self
            .get_select_columns()
            .iter()
            .map(|e| match table_alias {
                Some(alias) => format!("{alias}.{}", e.details.quoted_sql_name()),
                None => e.details.quoted_sql_name().to_string(),
            })
            .collect();
        if cols.is_empty() {
            return;
        }
        write_list(sql, header, &cols, footer);
    }

    /// `SELECT a, b FROM t WHERE k = @k`。
    pub fn build_select_by_key_statement(
        &mut self,
        sql: &mut String,
        table: &str,
        footer: &str,
    ) -> Result<()> {
        if !self.has_read_fields() {
            return Err(BindError::invalid_argument(
                "desired_columns",
                format!("no column of {} is marked for read", self.name()),
            ));
        }
        self.require_keys()?;
        self.build_select_clause(sql, "SELECT ", None, &format!(" FROM {table}"));
        self.build_where_clause(sql, " WHERE ", footer);
        Ok(())
    }

    /// 从表值参数中选出插入列：字面值输出 `@var`，TVP 引用输出 `alias.column`。
    pub fn build_select_tvp_clause(
        &mut self,
        sql: &mut String,
        header: &str,
        tvp_alias: &str,
        footer: &str,
    ) {
        let items: Vec<String> = self
            .get_insert_columns()
            .iter()
            .map(|e| match &e.value {
                BoundValue::TableColumn(column) => format!("{tvp_alias}.{column}"),
                _ => e.details.sql_variable_name().to_string(),
            })
            .collect();
        write_list(sql, header, &items, footer);
    }

    /// ORDER BY 列表。所有列名先校验，全部能解析才追加；空列表不输出。
    pub fn build_order_by_clause(
        &self,
        sql: &mut String,
        header: &str,
        sort: &[SortExpression],
        footer: &str,
    ) -> Result<()> {
        let mut items = Vec::with_capacity(sort.len());
        for expr in sort {
            match expr {
                SortExpression::Raw(raw) => items.push(raw.clone()),
                SortExpression::Column { name, direction } => {
                    let entry = self
                        .entries()
                        .iter()
                        .find(|e| e.matches_column_name(name))
                        .ok_or_else(|| {
                            self.mapping_failure(BindError::UnknownSortColumn {
                                subject: self.name().to_string(),
                                column: name.clone(),
                            })
                        })?;
                    let quoted = entry.details.quoted_sql_name();
                    items.push(match direction {
                        SortDirection::Ascending => quoted.to_string(),
                        SortDirection::Descending => format!("{quoted} DESC"),
                    });
                }
            }
        }
        if items.is_empty() {
            return Ok(());
        }
        write_list(sql, header, &items, footer);
        Ok(())
    }

    /// 表值函数的实参：形参绑定变量，按声明顺序。
    pub fn build_from_function_clause(&mut self, sql: &mut String, header: &str, footer: &str) {
        let vars: Vec<String> = self
            .get_formal_parameters()
            .iter()
            .map(|e| e.details.sql_variable_name().to_string())
            .collect();
        write_list(sql, header, &vars, footer);
    }

    /// 排除已软删除的行：`IsDeleted <> @IsDeleted`，多条规则以 AND 连接；没有适用规则时不输出。
    ///
    /// 规则的“已删除”值会覆盖该列上已有的绑定值。
    pub fn build_soft_delete_clause(
        &mut self,
        sql: &mut String,
        header: &str,
        audit: AuditContext<'_>,
        footer: &str,
    ) {
        let mut items = Vec::new();
        for rule in audit.rules.soft_delete_rules_for(OperationKind::Select) {
            let Some(entry) = self
                .entries_mut()
                .iter_mut()
                .find(|e| e.matches_column_name(rule.column()))
            else {
                continue;
            };
            entry.value = BoundValue::Value(rule.deleted_value().clone());
            entry.use_parameter = true;
            items.push(format!(
                "{} <> {}",
                entry.details.quoted_sql_name(),
                entry.details.sql_variable_name()
            ));
        }
        if items.is_empty() {
            return;
        }
        sql.push_str(header);
        sql.push_str(&items.join(" AND "));
        sql.push_str(footer);
    }

    fn require_keys(&self) -> Result<()> {
        if self.entries().iter().any(|e| e.is_key) {
            Ok(())
        } else {
            Err(self.mapping_failure(BindError::NoPrimaryKey {
                subject: self.name().to_string(),
            }))
        }
    }
}
