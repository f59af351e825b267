use storage::Value;
use thiserror::Error;

use crate::ast::{GroupByClause, OrderByClause, QueryAstRequest, SelectClause, TimeRange, WhereClause};
use crate::builder::{is_allowed_operator, QueryBuilder};

/// Why a single clause could not be translated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClauseError {
    #[error("SELECT clause cannot be empty")]
    EmptySelect,

    /// A field or function clause with an empty name.
    #[error("unknown SELECT clause type")]
    UnknownSelectClause,

    #[error("FROM datasource cannot be empty")]
    EmptyFrom,

    #[error("IN operator requires array value for field {field}")]
    InRequiresArray { field: String },

    #[error("operator `{op}` is not allowed on field {field}")]
    OperatorNotAllowed { field: String, op: String },

    #[error("tenant scope requested but no tenant id is set")]
    MissingTenant,

    #[error("unknown GROUP BY clause type")]
    UnknownGroupByClause,

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("invalid time window `{0}`")]
    InvalidTimeWindow(String),

    #[error("invalid order direction `{0}`")]
    InvalidDirection(String),
}

/// A [`ClauseError`] tagged with the clause it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TranslateError {
    #[error("failed to translate SELECT: {0}")]
    SelectTranslationFailed(#[source] ClauseError),

    #[error("failed to translate FROM: {0}")]
    FromTranslationFailed(#[source] ClauseError),

    #[error("failed to translate WHERE: {0}")]
    WhereTranslationFailed(#[source] ClauseError),

    #[error("failed to translate GROUP BY: {0}")]
    GroupByTranslationFailed(#[source] ClauseError),

    #[error("failed to translate ORDER BY: {0}")]
    OrderByTranslationFailed(#[source] ClauseError),
}

/// Maps a [`QueryAstRequest`] onto [`QueryBuilder`] calls.
///
/// Identifiers are checked before they reach the builder, since the builder
/// splices them into the SQL text. Values always go through placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    tenant_scoped: bool,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A translator that prepends `tenant_id = ?` to every query.
    pub fn tenant_scoped() -> Self {
        Self {
            tenant_scoped: true,
        }
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.tenant_scoped
    }

    pub fn translate(&self, ast: &QueryAstRequest) -> Result<QueryBuilder, TranslateError> {
        let builder = QueryBuilder::new();
        let builder =
            translate_select(&ast.select, builder).map_err(TranslateError::SelectTranslationFailed)?;
        let builder = translate_from(ast, builder).map_err(TranslateError::FromTranslationFailed)?;
        let builder = self
            .translate_where(ast, builder)
            .map_err(TranslateError::WhereTranslationFailed)?;
        let builder = translate_group_by(&ast.group_by, builder)
            .map_err(TranslateError::GroupByTranslationFailed)?;
        let mut builder = translate_order_by(&ast.order_by, builder)
            .map_err(TranslateError::OrderByTranslationFailed)?;

        if let Some(limit) = ast.limit {
            builder = builder.set_limit(limit);
        }
        if let Some(offset) = ast.offset {
            builder = builder.set_offset(offset);
        }
        Ok(builder)
    }

    fn translate_where(
        &self,
        ast: &QueryAstRequest,
        mut builder: QueryBuilder,
    ) -> Result<QueryBuilder, ClauseError> {
        if self.tenant_scoped {
            let tenant = ast
                .tenant_id
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or(ClauseError::MissingTenant)?;
            builder = builder.and_where("tenant_id", "=", tenant);
        }

        if let Some(TimeRange { start, end }) = &ast.time_range {
            if !start.is_empty() {
                builder = builder.and_where("timestamp", ">=", start.as_str());
            }
            if !end.is_empty() {
                builder = builder.and_where("timestamp", "<=", end.as_str());
            }
        }

        for WhereClause { field, op, value } in &ast.where_clauses {
            check_identifier(field)?;
            if !is_allowed_operator(op) {
                return Err(ClauseError::OperatorNotAllowed {
                    field: field.clone(),
                    op: op.clone(),
                });
            }

            if op == "IN" {
                let serde_json::Value::Array(items) = value else {
                    return Err(ClauseError::InRequiresArray {
                        field: field.clone(),
                    });
                };
                let values = items.iter().cloned().map(Value::from).collect();
                builder = builder.and_where_in(field.as_str(), values);
            } else {
                builder = builder.and_where(field.as_str(), op, Value::from(value.clone()));
            }
        }
        Ok(builder)
    }
}

fn translate_select(
    clauses: &[SelectClause],
    mut builder: QueryBuilder,
) -> Result<QueryBuilder, ClauseError> {
    if clauses.is_empty() {
        return Err(ClauseError::EmptySelect);
    }

    for clause in clauses {
        builder = match clause {
            SelectClause::Field(field) => {
                if field.is_empty() {
                    return Err(ClauseError::UnknownSelectClause);
                }
                check_column(field)?;
                builder.select_fields([field.as_str()])
            }
            SelectClause::Function(func) => {
                if func.function.is_empty() {
                    return Err(ClauseError::UnknownSelectClause);
                }
                check_identifier(&func.function)?;
                for arg in &func.args {
                    check_column(arg)?;
                }
                if !func.alias.is_empty() {
                    check_identifier(&func.alias)?;
                }
                builder.select_func(&func.function, &func.args.join(", "), func.alias.as_str())
            }
        };
    }
    Ok(builder)
}

fn translate_from(ast: &QueryAstRequest, builder: QueryBuilder) -> Result<QueryBuilder, ClauseError> {
    let source = ast.from.ok_or(ClauseError::EmptyFrom)?;
    Ok(builder.from(source.as_str()))
}

fn translate_group_by(
    clauses: &[GroupByClause],
    mut builder: QueryBuilder,
) -> Result<QueryBuilder, ClauseError> {
    for clause in clauses {
        builder = match clause {
            GroupByClause::Field(field) => {
                if field.is_empty() {
                    return Err(ClauseError::UnknownGroupByClause);
                }
                check_identifier(field)?;
                builder.group_by([field.as_str()])
            }
            GroupByClause::TimeWindow(window) => {
                if !is_time_window(&window.window) {
                    return Err(ClauseError::InvalidTimeWindow(window.window.clone()));
                }
                let field = if window.field.is_empty() {
                    "timestamp"
                } else {
                    check_identifier(&window.field)?;
                    window.field.as_str()
                };
                builder.group_by_time_window(&window.window, field)
            }
        };
    }
    Ok(builder)
}

fn translate_order_by(
    clauses: &[OrderByClause],
    mut builder: QueryBuilder,
) -> Result<QueryBuilder, ClauseError> {
    for clause in clauses {
        check_identifier(&clause.field)?;
        let direction = if clause.direction.is_empty() {
            "DESC"
        } else {
            clause.direction.as_str()
        };
        if !direction.eq_ignore_ascii_case("ASC") && !direction.eq_ignore_ascii_case("DESC") {
            return Err(ClauseError::InvalidDirection(clause.direction.clone()));
        }
        builder = builder.order_by(clause.field.as_str(), direction);
    }
    Ok(builder)
}

/// `[A-Za-z_][A-Za-z0-9_.]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn check_identifier(s: &str) -> Result<(), ClauseError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(ClauseError::InvalidIdentifier(s.to_string()))
    }
}

/// An identifier or `*`.
fn check_column(s: &str) -> Result<(), ClauseError> {
    if s == "*" {
        return Ok(());
    }
    check_identifier(s)
}

/// A count followed by a unit, e.g. `5 minute` or `1h`.
fn is_time_window(s: &str) -> bool {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let unit = s[digits..].strip_prefix(' ').unwrap_or(&s[digits..]);
    !unit.is_empty() && unit.chars().all(|c| c.is_ascii_alphabetic())
}
