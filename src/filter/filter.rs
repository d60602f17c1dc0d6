use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{
    FilterOp, FilterOrderInfo, FilterWhereInfo, FilterWhereOptions, SortDirection, SqlResult,
};

/// SELECT builder for one table. Every query it renders excludes
/// soft-deleted rows unless the crate explicitly asks otherwise.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    known_columns: Vec<&'static str>,
    conditions: Vec<FilterWhereInfo>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<u32>,
    offset: Option<u32>,
    options: FilterWhereOptions,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            known_columns: vec![],
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
            options: FilterWhereOptions::default(),
        })
    }

    /// Restricts column references to the given set.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = &'static str>) -> Self {
        self.known_columns = columns.into_iter().collect();
        self
    }

    pub fn where_eq(
        &mut self,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, FilterError> {
        self.where_op(column, FilterOp::Eq, value.into())
    }

    pub fn where_op(
        &mut self,
        column: &str,
        operator: FilterOp,
        data: Value,
    ) -> Result<&mut Self, FilterError> {
        self.validate_column(column)?;
        self.conditions.push(FilterWhereInfo::Column {
            column: column.to_string(),
            operator,
            data,
        });
        Ok(self)
    }

    /// Free-text match of `term` against any of `columns`.
    pub fn search(&mut self, columns: &[&str], term: &str) -> Result<&mut Self, FilterError> {
        for column in columns {
            self.validate_column(column)?;
        }
        self.conditions.push(FilterWhereInfo::Search {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.to_string(),
        });
        Ok(self)
    }

    pub fn order(&mut self, column: &str, sort: SortDirection) -> Result<&mut Self, FilterError> {
        self.validate_column(column)?;
        self.order_data.push(FilterOrderInfo { column: column.to_string(), sort });
        Ok(self)
    }

    /// Accepts `"name desc, code"` style order specifications.
    pub fn order_by(&mut self, spec: &str) -> Result<&mut Self, FilterError> {
        for info in FilterOrder::parse(spec)? {
            self.order(&info.column, info.sort)?;
        }
        Ok(self)
    }

    pub fn limit(&mut self, limit: u32, offset: u32) -> Result<&mut Self, FilterError> {
        if limit == 0 {
            return Err(FilterError::InvalidLimit("Limit must be positive".to_string()));
        }
        self.limit = Some(limit);
        self.offset = Some(offset);
        Ok(self)
    }

    /// Lets crate-internal callers (seeding) see soft-deleted rows.
    pub(crate) fn include_deleted(&mut self) -> &mut Self {
        self.options.include_deleted = true;
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, &self.options)?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        };

        let query = [
            "SELECT *".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    /// COUNT over the same predicates, ignoring order and paging.
    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, &self.options)?;
        Ok(SqlResult {
            query: format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                self.table_name, where_clause
            ),
            params,
        })
    }

    fn validate_column(&self, column: &str) -> Result<(), FilterError> {
        if !is_identifier(column) {
            return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
        }
        if !self.known_columns.is_empty() && !self.known_columns.contains(&column) {
            return Err(FilterError::InvalidColumn(format!(
                "'{}' is not a column of {}",
                column, self.table_name
            )));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
