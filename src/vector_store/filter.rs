//! Metadata filter trees and their compilation to SQL predicates
//!
//! A filter tree is a boolean expression over leaf comparisons combined
//! with AND/OR groups. [`compile`] lowers it to a predicate string; an
//! empty tree lowers to an empty string and adds no WHERE clause.

use std::fmt;

use super::sql::{escape_literal, quote_identifier, CONTENT_COLUMN, ID_COLUMN, METADATA_COLUMN};

/// Comparison applied by a leaf filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    /// Backend operator emitted verbatim, e.g. `ILIKE`
    Other(String),
}

impl FilterOperator {
    pub fn as_sql(&self) -> &str {
        match self {
            FilterOperator::Equal => "=",
            FilterOperator::NotEqual => "!=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::Like => "LIKE",
            FilterOperator::Other(op) => op.as_str(),
        }
    }
}

/// Scalar compared against a column or metadata field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FilterValue {
    fn to_sql(&self) -> String {
        match self {
            FilterValue::String(s) => escape_literal(s),
            FilterValue::Integer(n) => n.to_string(),
            FilterValue::Float(f) if f.is_nan() => "'NaN'::double precision".to_string(),
            FilterValue::Float(f) if f.is_infinite() => {
                let literal = if *f > 0.0 { "Infinity" } else { "-Infinity" };
                format!("'{}'::double precision", literal)
            }
            FilterValue::Float(f) => f.to_string(),
            FilterValue::Boolean(true) => "TRUE".to_string(),
            FilterValue::Boolean(false) => "FALSE".to_string(),
        }
    }

    /// Value as a string literal, for comparison with a text column
    fn to_text_sql(&self) -> String {
        match self {
            FilterValue::String(s) => escape_literal(s),
            FilterValue::Integer(n) => escape_literal(&n.to_string()),
            FilterValue::Float(f) if f.is_nan() => escape_literal("NaN"),
            FilterValue::Float(f) => escape_literal(&f.to_string()),
            FilterValue::Boolean(b) => escape_literal(&b.to_string()),
        }
    }

    /// Cast applied to a metadata field so it compares with this value
    fn metadata_cast(&self) -> Option<&'static str> {
        match self {
            FilterValue::String(_) => None,
            FilterValue::Integer(_) | FilterValue::Float(_) => Some("double precision"),
            FilterValue::Boolean(_) => Some("boolean"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(i64::from(value))
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}

/// A single `key operator value` comparison
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub key: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl MetadataFilter {
    pub fn new(key: impl Into<String>, operator: FilterOperator, value: impl Into<FilterValue>) -> Self {
        Self {
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(key, FilterOperator::Equal, value)
    }
}

/// How the children of a group combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterCondition {
    #[default]
    And,
    Or,
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterCondition::And => f.write_str("AND"),
            FilterCondition::Or => f.write_str("OR"),
        }
    }
}

/// A group of filters combined with one condition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataFilters {
    pub condition: FilterCondition,
    pub filters: Vec<FilterNode>,
}

impl MetadataFilters {
    pub fn new(condition: FilterCondition, filters: Vec<FilterNode>) -> Self {
        Self { condition, filters }
    }

    pub fn and(filters: Vec<FilterNode>) -> Self {
        Self::new(FilterCondition::And, filters)
    }

    pub fn or(filters: Vec<FilterNode>) -> Self {
        Self::new(FilterCondition::Or, filters)
    }
}

/// Node of a filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf(MetadataFilter),
    Group(MetadataFilters),
}

impl From<MetadataFilter> for FilterNode {
    fn from(filter: MetadataFilter) -> Self {
        FilterNode::Leaf(filter)
    }
}

impl From<MetadataFilters> for FilterNode {
    fn from(filters: MetadataFilters) -> Self {
        FilterNode::Group(filters)
    }
}

/// Lower a filter tree to a predicate; empty when no leaves survive
pub fn compile(node: &FilterNode) -> String {
    match node {
        FilterNode::Leaf(leaf) => compile_leaf(leaf),
        FilterNode::Group(group) => compile_group(group),
    }
}

fn compile_leaf(leaf: &MetadataFilter) -> String {
    let (key, value) = if is_column(&leaf.key) {
        (quote_identifier(&leaf.key), leaf.value.to_text_sql())
    } else {
        (metadata_expression(&leaf.key, &leaf.value), leaf.value.to_sql())
    };
    format!("{} {} {}", key, leaf.operator.as_sql(), value)
}

fn compile_group(group: &MetadataFilters) -> String {
    let mut parts: Vec<String> = group
        .filters
        .iter()
        .map(compile)
        .filter(|part| !part.is_empty())
        .collect();

    match parts.len() {
        0 => String::new(),
        1 => parts.remove(0),
        _ => format!("({})", parts.join(&format!(" {} ", group.condition))),
    }
}

/// `id` and `content` are text columns, any other key is a metadata field
fn is_column(key: &str) -> bool {
    key == ID_COLUMN || key == CONTENT_COLUMN
}

fn metadata_expression(key: &str, value: &FilterValue) -> String {
    let field = format!("{}->>{}", METADATA_COLUMN, escape_literal(key));
    match value.metadata_cast() {
        Some(cast) => format!("({})::{}", field, cast),
        None => field,
    }
}
