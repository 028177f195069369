//! Identifier-safe SELECT construction for the relational entity source
//!
//! Table and column names are allow-listed against
//! `^[A-Za-z_][A-Za-z0-9_]*$` and bracket-quoted. Every literal value is bound
//! as a named parameter (`@p0`, `@p1`, ...); values are never spliced into the
//! command text.

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{ToSql, Value};

use crate::error::{IndexError, Result};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Like,
}

impl SqlOperator {
    fn token(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Like => "LIKE",
        }
    }
}

/// A bound parameter; `name` includes the `@` prefix
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

/// Finished command text plus its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltSql {
    pub command_text: String,
    pub parameters: Vec<SqlParameter>,
}

impl BuiltSql {
    /// Parameters in the form accepted by `Statement::query`
    pub fn named_params(&self) -> Vec<(&str, &dyn ToSql)> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_str(), &p.value as &dyn ToSql))
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Logic {
    And,
    Or,
}

/// Fluent SELECT builder
#[derive(Debug, Clone, Default)]
pub struct SelectQueryBuilder {
    table: String,
    columns: Vec<String>,
    predicates: Vec<(String, Option<Logic>)>,
    order: Vec<String>,
    parameters: Vec<SqlParameter>,
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQueryBuilder {
    pub fn from(table: &str) -> Result<Self> {
        Ok(Self {
            table: sanitize_identifier(table, "table")?.to_string(),
            ..Self::default()
        })
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add columns; blank entries are skipped
    pub fn columns(mut self, columns: &[&str]) -> Result<Self> {
        for column in columns.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            self.columns.push(bracket(sanitize_identifier(column, "column")?));
        }
        Ok(self)
    }

    pub fn where_cmp(self, column: &str, op: SqlOperator, value: impl Into<Value>) -> Result<Self> {
        self.push_cmp(column, op, value.into(), Logic::And)
    }

    pub fn or_where_cmp(self, column: &str, op: SqlOperator, value: impl Into<Value>) -> Result<Self> {
        self.push_cmp(column, op, value.into(), Logic::Or)
    }

    pub fn where_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let col = bracket(sanitize_identifier(column, "column")?);
        let mut names = Vec::new();
        for value in values {
            names.push(self.bind(value.into()));
        }
        if names.is_empty() {
            return Err(IndexError::invalid_argument("IN list cannot be empty"));
        }
        let clause = format!("{} IN ({})", col, names.join(","));
        self.push_predicate(clause, Logic::And);
        Ok(self)
    }

    /// Append a caller-authored predicate verbatim
    pub fn where_raw(mut self, predicate: &str) -> Result<Self> {
        if predicate.trim().is_empty() {
            return Err(IndexError::invalid_argument("raw predicate required"));
        }
        self.push_predicate(predicate.to_string(), Logic::And);
        Ok(self)
    }

    pub fn order_by(mut self, column: &str, dir: SortDirection) -> Result<Self> {
        let col = bracket(sanitize_identifier(column, "column")?);
        let dir = match dir {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        self.order.push(format!("{} {}", col, dir));
        Ok(self)
    }

    pub fn limit(mut self, count: u64) -> Result<Self> {
        if count == 0 {
            return Err(IndexError::invalid_argument("limit must be positive"));
        }
        self.limit = Some(count);
        Ok(self)
    }

    /// 1-based page selection
    pub fn page(mut self, page_number: u64, page_size: u64) -> Result<Self> {
        if page_number < 1 {
            return Err(IndexError::invalid_argument("page number must be >= 1"));
        }
        if page_size < 1 {
            return Err(IndexError::invalid_argument("page size must be >= 1"));
        }
        self.offset = Some((page_number - 1) * page_size);
        self.limit = Some(page_size);
        Ok(self)
    }

    pub fn build(&self) -> Result<BuiltSql> {
        if self.offset.is_some() && self.order.is_empty() {
            return Err(IndexError::invalid_argument(
                "ORDER BY required when paging",
            ));
        }

        let mut sql = String::with_capacity(256);
        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(","));
        }
        sql.push_str(" FROM ");
        sql.push_str(&bracket(&self.table));

        if !self.predicates.is_empty() {
            sql.push_str(" WHERE ");
            for (clause, logic) in &self.predicates {
                match logic {
                    Some(Logic::And) => sql.push_str(" AND "),
                    Some(Logic::Or) => sql.push_str(" OR "),
                    None => {}
                }
                sql.push_str(clause);
            }
        }

        if !self.order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        Ok(BuiltSql {
            command_text: sql,
            parameters: self.parameters.clone(),
        })
    }

    fn push_cmp(mut self, column: &str, op: SqlOperator, value: Value, logic: Logic) -> Result<Self> {
        let col = bracket(sanitize_identifier(column, "column")?);
        let name = self.bind(value);
        self.push_predicate(format!("{} {} {}", col, op.token(), name), logic);
        Ok(self)
    }

    fn push_predicate(&mut self, clause: String, logic: Logic) {
        let logic = if self.predicates.is_empty() {
            None
        } else {
            Some(logic)
        };
        self.predicates.push((clause, logic));
    }

    fn bind(&mut self, value: Value) -> String {
        let name = format!("@p{}", self.parameters.len());
        self.parameters.push(SqlParameter {
            name: name.clone(),
            value,
        });
        name
    }
}

fn sanitize_identifier<'a>(raw: &'a str, what: &str) -> Result<&'a str> {
    if raw.trim().is_empty() {
        return Err(IndexError::invalid_argument(format!("{} identifier cannot be empty", what)));
    }
    if !IDENTIFIER.is_match(raw) {
        return Err(IndexError::invalid_argument(format!(
            "invalid {} identifier '{}': letters, digits and underscore only, cannot start with a digit",
            what, raw
        )));
    }
    Ok(raw)
}

fn bracket(ident: &str) -> String {
    format!("[{}]", ident)
}
