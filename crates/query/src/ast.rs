//! Query AST: the typed intermediate representation clients post.
//!
//! Select and group-by items come in two JSON shapes. A bare string is a
//! field; an object is an aggregation (select) or a time window (group by).
//! Anything else is rejected while decoding.
//!
//! ```json
//! {
//!   "select": ["topic", {"function": "count", "args": ["*"], "alias": "total"}],
//!   "from": "events",
//!   "time_range": {"start": "2024-01-01 00:00:00", "end": "2024-01-02 00:00:00"},
//!   "where": [{"field": "event_type", "op": "IN", "value": ["click", "view"]}],
//!   "group_by": ["topic", {"time_window": "5 minute"}],
//!   "order_by": [{"field": "total"}],
//!   "limit": 100
//! }
//! ```
use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Fixed set of queryable sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datasource {
    Events,
    Logs,
    Errors,
    Metrics,
    EventsMinuteStatsMv,
    EventsHourlyStatsMv,
    TopSourcesMv,
}

impl Datasource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datasource::Events => "events",
            Datasource::Logs => "logs",
            Datasource::Errors => "errors",
            Datasource::Metrics => "metrics",
            Datasource::EventsMinuteStatsMv => "events_minute_stats_mv",
            Datasource::EventsHourlyStatsMv => "events_hourly_stats_mv",
            Datasource::TopSourcesMv => "top_sources_mv",
        }
    }
}

/// `function(args...) AS alias`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFunction {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alias: String,
}

/// Bucket `field` into windows of width `window` (e.g. `"5 minute"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(rename = "time_window")]
    pub window: String,
    /// Empty means `timestamp`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectClause {
    Field(String),
    Function(AggregateFunction),
}

impl SelectClause {
    pub fn field(name: impl Into<String>) -> Self {
        SelectClause::Field(name.into())
    }

    pub fn function<I, S>(function: impl Into<String>, args: I, alias: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectClause::Function(AggregateFunction {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
            alias: alias.into(),
        })
    }

    pub fn is_field(&self) -> bool {
        matches!(self, SelectClause::Field(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, SelectClause::Function(_))
    }
}

impl Serialize for SelectClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SelectClause::Field(field) => serializer.serialize_str(field),
            SelectClause::Function(function) => function.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SelectClause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(field) => Ok(SelectClause::Field(field)),
            obj @ serde_json::Value::Object(_) => serde_json::from_value(obj)
                .map(SelectClause::Function)
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom(
                "select must be string or aggregation object",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupByClause {
    Field(String),
    TimeWindow(TimeWindow),
}

impl GroupByClause {
    pub fn field(name: impl Into<String>) -> Self {
        GroupByClause::Field(name.into())
    }

    pub fn time_window(window: impl Into<String>, field: impl Into<String>) -> Self {
        GroupByClause::TimeWindow(TimeWindow {
            window: window.into(),
            field: field.into(),
        })
    }
}

impl Serialize for GroupByClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            GroupByClause::Field(field) => serializer.serialize_str(field),
            GroupByClause::TimeWindow(window) => window.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for GroupByClause {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(field) => Ok(GroupByClause::Field(field)),
            obj @ serde_json::Value::Object(_) => serde_json::from_value(obj)
                .map(GroupByClause::TimeWindow)
                .map_err(D::Error::custom),
            _ => Err(D::Error::custom(
                "groupBy must be string or time window object",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub op: String,
    pub value: serde_json::Value,
}

impl WhereClause {
    pub fn new(
        field: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByClause {
    pub field: String,
    /// `ASC` or `DESC`; empty until defaults are applied.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub direction: String,
}

impl OrderByClause {
    pub fn new(field: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: direction.into(),
        }
    }
}

/// Opaque range bounds compared against `timestamp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub end: String,
}

/// An analytical query as posted by a client.
///
/// `tenant_id` and `request_id` are set by the server and never read from or
/// written to the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAstRequest {
    #[serde(default)]
    pub select: Vec<SelectClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Datasource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(rename = "where", default, skip_serializing_if = "Vec::is_empty")]
    pub where_clauses: Vec<WhereClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<GroupByClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(skip)]
    pub tenant_id: Option<String>,
    #[serde(skip)]
    pub request_id: String,
}

/// Rows returned for a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub request_id: String,
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub row_count: usize,
}

impl QueryResponse {
    pub fn empty(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            data: Vec::new(),
            row_count: 0,
        }
    }
}
