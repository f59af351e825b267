//! Incremental, parameterized statement assembler.
//!
//! Values never appear in the rendered SQL; each one becomes a `?` and is
//! returned in the argument list in the same left-to-right order.
//!
//! ```
//! use query::QueryBuilder;
//! use storage::Value;
//!
//! let (sql, args) = QueryBuilder::new()
//!     .select_fields(["a"])
//!     .from("t")
//!     .and_where("a", "=", 1)
//!     .set_limit(10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(sql, "SELECT a FROM t WHERE a = ? LIMIT ?");
//! assert_eq!(args, vec![Value::Int(1), Value::UInt(10)]);
//! ```
use storage::Value;
use thiserror::Error;
use tracing::warn;

/// Comparison operators accepted by [`QueryBuilder::and_where`].
pub const ALLOWED_OPERATORS: [&str; 8] = ["=", "!=", ">", "<", ">=", "<=", "IN", "LIKE"];

pub fn is_allowed_operator(op: &str) -> bool {
    ALLOWED_OPERATORS.contains(&op)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    #[error("no select clause defined")]
    NoSelectClauseDefined,

    #[error("no from source defined")]
    NoFromSourceDefined,

    /// An `IN` predicate whose value is not an array.
    #[error("IN operator on `{field}` requires an array value")]
    InOperator { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectExpr {
    pub expression: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereExpr {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByExpr {
    pub field: String,
    pub direction: String,
}

/// Everything a statement is rendered from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlComponents {
    pub select: Vec<SelectExpr>,
    pub from: String,
    pub where_clauses: Vec<WhereExpr>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Chainable builder over [`SqlComponents`], consumed by [`build`](QueryBuilder::build).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    components: SqlComponents,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &SqlComponents {
        &self.components
    }

    pub fn select<I>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = SelectExpr>,
    {
        self.components.select.extend(exprs);
        self
    }

    pub fn select_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components
            .select
            .extend(fields.into_iter().map(|field| SelectExpr {
                expression: field.into(),
                alias: None,
            }));
        self
    }

    pub fn select_as(mut self, field: impl Into<String>, alias: impl Into<String>) -> Self {
        self.components.select.push(SelectExpr {
            expression: field.into(),
            alias: non_empty(alias.into()),
        });
        self
    }

    /// Renders `function(args)`, with ` AS alias` when `alias` is not empty.
    pub fn select_func(mut self, function: &str, args: &str, alias: impl Into<String>) -> Self {
        self.components.select.push(SelectExpr {
            expression: format!("{function}({args})"),
            alias: non_empty(alias.into()),
        });
        self
    }

    pub fn from(mut self, source: impl Into<String>) -> Self {
        self.components.from = source.into();
        self
    }

    /// Append `field operator ?`.
    ///
    /// Operators outside [`ALLOWED_OPERATORS`] are dropped (and logged), not
    /// rejected. Callers that need a hard failure must check
    /// [`is_allowed_operator`] first.
    pub fn and_where(
        mut self,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Self {
        let field = field.into();
        if !is_allowed_operator(operator) {
            warn!(field = %field, operator, "where_operator_dropped");
            return self;
        }
        self.components.where_clauses.push(WhereExpr {
            field,
            operator: operator.to_string(),
            value: value.into(),
        });
        self
    }

    /// Append `field IN (?, ...)`. Does nothing when `values` is empty.
    pub fn and_where_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return self;
        }
        self.components.where_clauses.push(WhereExpr {
            field: field.into(),
            operator: "IN".to_string(),
            value: Value::Array(values),
        });
        self
    }

    pub fn group_by<I, S>(mut self, exprs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components
            .group_by
            .extend(exprs.into_iter().map(Into::into));
        self
    }

    /// Group by `toStartOfInterval(field, INTERVAL window)`.
    pub fn group_by_time_window(mut self, window: &str, field: &str) -> Self {
        self.components
            .group_by
            .push(format!("toStartOfInterval({field}, INTERVAL {window})"));
        self
    }

    /// Direction defaults to `DESC` and is upper-cased.
    pub fn order_by(mut self, field: impl Into<String>, direction: &str) -> Self {
        let direction = if direction.is_empty() {
            "DESC".to_string()
        } else {
            direction.to_uppercase()
        };
        self.components.order_by.push(OrderByExpr {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn set_limit(mut self, limit: u64) -> Self {
        self.components.limit = Some(limit);
        self
    }

    pub fn set_offset(mut self, offset: u64) -> Self {
        self.components.offset = Some(offset);
        self
    }

    /// Render the statement and its positional arguments.
    ///
    /// Arguments are ordered where-clauses first, then limit, then offset,
    /// matching placeholder order in the SQL.
    pub fn build(self) -> Result<(String, Vec<Value>), BuildError> {
        let SqlComponents {
            select,
            from,
            where_clauses,
            group_by,
            order_by,
            limit,
            offset,
        } = self.components;

        if select.is_empty() {
            return Err(BuildError::NoSelectClauseDefined);
        }
        if from.is_empty() {
            return Err(BuildError::NoFromSourceDefined);
        }

        let mut sql = String::from("SELECT ");
        let mut args = Vec::new();

        let rendered: Vec<String> = select
            .iter()
            .map(|expr| match &expr.alias {
                Some(alias) => format!("{} AS {}", expr.expression, alias),
                None => expr.expression.clone(),
            })
            .collect();
        sql.push_str(&rendered.join(", "));

        sql.push_str(" FROM ");
        sql.push_str(&from);

        if !where_clauses.is_empty() {
            let mut predicates = Vec::with_capacity(where_clauses.len());
            for clause in where_clauses {
                predicates.push(render_predicate(clause, &mut args)?);
            }
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        if !group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&group_by.join(", "));
        }

        if !order_by.is_empty() {
            let rendered: Vec<String> = order_by
                .iter()
                .map(|ob| format!("{} {}", ob.field, ob.direction))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&rendered.join(", "));
        }

        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            args.push(Value::UInt(limit));
        }
        if let Some(offset) = offset {
            sql.push_str(" OFFSET ?");
            args.push(Value::UInt(offset));
        }

        Ok((sql, args))
    }
}

fn render_predicate(clause: WhereExpr, args: &mut Vec<Value>) -> Result<String, BuildError> {
    let WhereExpr {
        field,
        operator,
        value,
    } = clause;

    if operator != "IN" {
        args.push(value);
        return Ok(format!("{field} {operator} ?"));
    }

    let Value::Array(values) = value else {
        return Err(BuildError::InOperator { field });
    };

    let mut rendered = format!("{field} IN (");
    for i in 0..values.len() {
        if i > 0 {
            rendered.push_str(", ");
        }
        rendered.push('?');
    }
    rendered.push(')');
    args.extend(values);
    Ok(rendered)
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_simple_statement_with_ordered_args() {
        let (sql, args) = QueryBuilder::new()
            .select_fields(["a"])
            .from("t")
            .and_where("a", "=", 1)
            .set_limit(10)
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT a FROM t WHERE a = ? LIMIT ?");
        assert_eq!(args, vec![Value::Int(1), Value::UInt(10)]);
    }

    #[test]
    fn in_clause_expands_one_placeholder_per_value() {
        let (sql, args) = QueryBuilder::new()
            .select_fields(["x"])
            .from("t")
            .and_where_in("x", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT x FROM t WHERE x IN (?, ?, ?)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn empty_in_list_is_a_no_op() {
        let (sql, args) = QueryBuilder::new()
            .select_fields(["x"])
            .from("t")
            .and_where_in("x", Vec::new())
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT x FROM t");
        assert!(args.is_empty());
    }

    #[test]
    fn build_requires_select_then_from() {
        assert_eq!(
            QueryBuilder::new().from("t").build(),
            Err(BuildError::NoSelectClauseDefined)
        );
        assert_eq!(
            QueryBuilder::new().select_fields(["a"]).build(),
            Err(BuildError::NoFromSourceDefined)
        );
    }

    #[test]
    fn unknown_operator_is_dropped() {
        let (sql, args) = QueryBuilder::new()
            .select_fields(["a"])
            .from("t")
            .and_where("a", "; DROP TABLE t; --", 1)
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT a FROM t");
        assert!(args.is_empty());
    }

    #[test]
    fn in_operator_with_scalar_fails_at_build() {
        let res = QueryBuilder::new()
            .select_fields(["a"])
            .from("t")
            .and_where("a", "IN", 1)
            .build();
        assert_eq!(
            res,
            Err(BuildError::InOperator {
                field: "a".into()
            })
        );
    }

    #[test]
    fn renders_every_clause_in_fixed_order() {
        let (sql, args) = QueryBuilder::new()
            .select_fields(["topic"])
            .select_func("count", "*", "total")
            .select_as("source_id", "src")
            .from("events")
            .and_where("timestamp", ">=", "2024-01-01")
            .and_where_in("event_type", vec![Value::from("a"), Value::from("b")])
            .and_where("topic", "LIKE", "orders%")
            .group_by(["topic"])
            .group_by_time_window("5 minute", "timestamp")
            .order_by("total", "asc")
            .order_by("topic", "")
            .set_limit(50)
            .set_offset(100)
            .build()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT topic, count(*) AS total, source_id AS src FROM events \
             WHERE timestamp >= ? AND event_type IN (?, ?) AND topic LIKE ? \
             GROUP BY topic, toStartOfInterval(timestamp, INTERVAL 5 minute) \
             ORDER BY total ASC, topic DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            args,
            vec![
                Value::from("2024-01-01"),
                Value::from("a"),
                Value::from("b"),
                Value::from("orders%"),
                Value::UInt(50),
                Value::UInt(100),
            ]
        );
    }

    #[test]
    fn zero_limit_and_offset_are_still_rendered() {
        let (sql, args) = QueryBuilder::new()
            .select_fields(["a"])
            .from("t")
            .set_limit(0)
            .set_offset(0)
            .build()
            .unwrap();
        assert_eq!(sql, "SELECT a FROM t LIMIT ? OFFSET ?");
        assert_eq!(args, vec![Value::UInt(0), Value::UInt(0)]);
    }
}
