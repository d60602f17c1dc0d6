use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, FilterWhereOptions};

/// Soft-delete predicate prepended to every WHERE clause unless the caller
/// explicitly opts out (crate-internal only).
pub const NOT_DELETED: &str = "\"is_deleted\" = 0";

pub struct FilterWhere {
    param_values: Vec<Value>,
}

impl FilterWhere {
    fn new() -> Self {
        Self { param_values: vec![] }
    }

    pub fn generate(
        conditions: &[FilterWhereInfo],
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new();
        filter_where.build(conditions, options)
    }

    fn build(
        &mut self,
        conditions: &[FilterWhereInfo],
        options: &FilterWhereOptions,
    ) -> Result<(String, Vec<Value>), FilterError> {
        let mut sql_conditions = vec![];
        if !options.include_deleted {
            sql_conditions.push(NOT_DELETED.to_string());
        }
        for condition in conditions {
            if let Some(sql) = self.build_sql_condition(condition)? {
                sql_conditions.push(sql);
            }
        }
        let where_clause = if sql_conditions.is_empty() {
            "1=1".to_string()
        } else {
            sql_conditions.join(" AND ")
        };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn build_sql_condition(
        &mut self,
        condition: &FilterWhereInfo,
    ) -> Result<Option<String>, FilterError> {
        match condition {
            FilterWhereInfo::Search { columns, term } => {
                let term = term.trim();
                if term.is_empty() || columns.is_empty() {
                    return Ok(None);
                }
                let pattern = format!("%{}%", escape_like(term));
                let parts: Vec<String> = columns
                    .iter()
                    .map(|c| format!("\"{}\" LIKE {} ESCAPE '\\'", c, self.param(Value::String(pattern.clone()))))
                    .collect();
                Ok(Some(format!("({})", parts.join(" OR "))))
            }
            FilterWhereInfo::Column { column, operator, data } => {
                let quoted_column = format!("\"{}\"", column);
                match operator {
                    FilterOp::Null => Ok(Some(format!("{} IS NULL", quoted_column))),
                    FilterOp::NotNull => Ok(Some(format!("{} IS NOT NULL", quoted_column))),
                    FilterOp::Eq if data.is_null() => Ok(Some(format!("{} IS NULL", quoted_column))),
                    FilterOp::Neq if data.is_null() => {
                        Ok(Some(format!("{} IS NOT NULL", quoted_column)))
                    }
                    FilterOp::In => {
                        let values = data.as_array().ok_or_else(|| {
                            FilterError::InvalidOperatorData(format!(
                                "IN on '{}' requires an array",
                                column
                            ))
                        })?;
                        if values.is_empty() {
                            return Ok(Some("1=0".to_string()));
                        }
                        let params: Vec<String> =
                            values.iter().map(|v| self.param(v.clone())).collect();
                        Ok(Some(format!("{} IN ({})", quoted_column, params.join(", "))))
                    }
                    op => Ok(Some(format!(
                        "{} {} {}",
                        quoted_column,
                        op.to_sql(),
                        self.param(data.clone())
                    ))),
                }
            }
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        "?".to_string()
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
