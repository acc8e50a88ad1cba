//! Typed attribute predicates.
//!
//! A raw field carries its value as loosely shaped JSON whose meaning depends
//! on the field type. [`FieldPredicate`] decodes that into a sum type, and
//! [`FieldPredicate::lower`] reduces it to a [`Condition`] that both the OGC
//! and the CQL encoders render. Every "drop this field" rule lives in
//! `lower`, so the two output formats agree on which fields survive.
//!
//! ```text
//! FilterField / SimpleFilterField
//!   └─ FieldPredicate { attribute, operator, value: PredicateValue }
//!        └─ lower() ─┬─ Compare / Between / Like / IsNull / OneOf / AnyOf
//!                    └─ None  (field dropped, logged at warn)
//! ```

use crate::descriptor::{FieldType, FilterField, Operator, SimpleFilterField};
use crate::LOG_TARGET;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// A literal operand, tagged with how CQL must quote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    Number(String),
    /// ISO-8601 instant, e.g. `2016-01-01T00:00:00.000Z`
    Date(String),
}

impl Literal {
    pub fn as_str(&self) -> &str {
        match self {
            Literal::Text(s) | Literal::Number(s) | Literal::Date(s) => s,
        }
    }
}

/// Lowered form of a predicate on one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Binary comparison; `op` is one of the plain comparison operators
    Compare { op: Operator, literal: Literal },
    Between { lower: Literal, upper: Literal },
    /// Substring match; the encoders add the wildcards
    Like { value: String, match_case: bool },
    IsNull,
    /// Membership in a value list, optionally also accepting null
    OneOf { values: Vec<Literal>, include_null: bool },
    /// Any of several alternatives
    AnyOf(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumberRange {
    pub low: Option<String>,
    pub up: Option<String>,
}

/// One entry of a list field; `None` stands for the null option.
pub type ListItem = Option<String>;

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Date(DateRange),
    Number(NumberRange),
    String(Option<String>),
    /// Single-choice list from a group field
    List(Option<String>),
    /// Multi-choice list from a simple field
    ListMany(Vec<ListItem>),
    /// Several alternatives of a simple field, each rendered alone and OR-ed
    Alternatives(Vec<PredicateValue>),
}

/// A field predicate after type dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate<'a> {
    pub attribute: &'a str,
    pub operator: Operator,
    pub value: PredicateValue,
}

impl<'a> FieldPredicate<'a> {
    /// Types a grouped field. `None` for an unsupported field type.
    pub fn from_field(field: &'a FilterField) -> Option<Self> {
        let value = match field.field_type {
            FieldType::List => PredicateValue::List(scalar_text(&field.value)),
            other => decode_value(other, &field.value)?,
        };
        Some(Self {
            attribute: &field.attribute,
            operator: field.operator,
            value,
        })
    }

    /// Types a simple (multi-valued) field. `None` for an unsupported field type.
    pub fn from_simple(field: &'a SimpleFilterField) -> Option<Self> {
        let value = match (field.field_type, &field.values) {
            (FieldType::List, Value::Array(items)) => {
                PredicateValue::ListMany(items.iter().map(list_item).collect())
            }
            (FieldType::List, other) => PredicateValue::ListMany(vec![list_item(other)]),
            (field_type, Value::Array(items)) if items.len() == 1 => {
                decode_value(field_type, &items[0])?
            }
            (field_type, Value::Array(items)) => PredicateValue::Alternatives(
                items
                    .iter()
                    .map(|item| decode_value(field_type, item))
                    .collect::<Option<Vec<_>>>()?,
            ),
            (field_type, other) => decode_value(field_type, other)?,
        };
        Some(Self {
            attribute: &field.attribute,
            operator: field.operator,
            value,
        })
    }

    /// Reduces the predicate to a renderable condition, or `None` when the
    /// field is incomplete for its operator and must be left out.
    pub fn lower(&self) -> Option<Condition> {
        let lowered = lower_value(self.operator, &self.value);
        if lowered.is_none() {
            tracing::warn!(
                target: LOG_TARGET,
                attribute = %self.attribute,
                operator = self.operator.symbol(),
                "field dropped from filter"
            );
        }
        lowered
    }
}

fn lower_value(operator: Operator, value: &PredicateValue) -> Option<Condition> {
    match value {
        PredicateValue::Date(range) => lower_date(operator, range),
        PredicateValue::Number(range) => lower_number(operator, range),
        PredicateValue::String(text) => lower_string(operator, text.as_deref()),
        PredicateValue::List(item) => item.as_ref().map(|text| Condition::Compare {
            op: Operator::Eq,
            literal: Literal::Text(text.clone()),
        }),
        PredicateValue::ListMany(items) => {
            if items.is_empty() {
                return None;
            }
            let values = items
                .iter()
                .flatten()
                .map(|text| Literal::Text(text.clone()))
                .collect();
            Some(Condition::OneOf {
                values,
                include_null: items.iter().any(Option::is_none),
            })
        }
        PredicateValue::Alternatives(values) => {
            let conditions: Vec<_> = values
                .iter()
                .filter_map(|value| lower_value(operator, value))
                .collect();
            match conditions.len() {
                0 => None,
                1 => conditions.into_iter().next(),
                _ => Some(Condition::AnyOf(conditions)),
            }
        }
    }
}

fn lower_date(operator: Operator, range: &DateRange) -> Option<Condition> {
    match operator {
        Operator::Between => Some(Condition::Between {
            lower: date_literal(range.start.as_ref()?),
            upper: date_literal(range.end.as_ref()?),
        }),
        op if op.is_comparison() => Some(Condition::Compare {
            op,
            literal: date_literal(range.start.as_ref()?),
        }),
        _ => None,
    }
}

fn lower_number(operator: Operator, range: &NumberRange) -> Option<Condition> {
    let low = range.low.clone().map(Literal::Number);
    let up = range.up.clone().map(Literal::Number);
    match operator {
        Operator::Between => match (low, up) {
            (Some(lower), Some(upper)) => Some(Condition::Between { lower, upper }),
            (Some(literal), None) => Some(Condition::Compare {
                op: Operator::Gte,
                literal,
            }),
            (None, Some(literal)) => Some(Condition::Compare {
                op: Operator::Lte,
                literal,
            }),
            (None, None) => None,
        },
        op if op.is_comparison() => Some(Condition::Compare { op, literal: low? }),
        _ => None,
    }
}

fn lower_string(operator: Operator, text: Option<&str>) -> Option<Condition> {
    match operator {
        Operator::IsNull => Some(Condition::IsNull),
        Operator::Like | Operator::ILike => Some(Condition::Like {
            value: text?.to_string(),
            match_case: operator == Operator::Like,
        }),
        op if op.is_comparison() => Some(Condition::Compare {
            op,
            literal: Literal::Text(text?.to_string()),
        }),
        _ => None,
    }
}

fn decode_value(field_type: FieldType, value: &Value) -> Option<PredicateValue> {
    match field_type {
        FieldType::Date => Some(PredicateValue::Date(date_range(value))),
        FieldType::Number => Some(PredicateValue::Number(number_range(value))),
        FieldType::String => Some(PredicateValue::String(scalar_text(value))),
        FieldType::List => Some(PredicateValue::List(scalar_text(value))),
        FieldType::Unsupported => None,
    }
}

/// `{startDate, endDate}` or a bare instant standing for the start.
fn date_range(value: &Value) -> DateRange {
    match value {
        Value::Object(map) => DateRange {
            start: map.get("startDate").and_then(parse_instant),
            end: map.get("endDate").and_then(parse_instant),
        },
        other => DateRange {
            start: parse_instant(other),
            end: None,
        },
    }
}

/// `{lowBound, upBound}` or a bare number standing for the low bound.
fn number_range(value: &Value) -> NumberRange {
    match value {
        Value::Object(map) => NumberRange {
            low: map.get("lowBound").and_then(number_text),
            up: map.get("upBound").and_then(number_text),
        },
        other => NumberRange {
            low: number_text(other),
            up: None,
        },
    }
}

fn number_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|_| trimmed.to_string())
        }
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn list_item(value: &Value) -> ListItem {
    match value {
        Value::String(s) if s == "null" => None,
        other => scalar_text(other),
    }
}

/// Accepts RFC 3339, a naive date-time or date (taken as UTC), or epoch
/// milliseconds.
fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
                return Some(instant.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
            Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
        }
        Value::Number(millis) => DateTime::<Utc>::from_timestamp_millis(millis.as_i64()?),
        _ => None,
    }
}

fn date_literal(instant: &DateTime<Utc>) -> Literal {
    Literal::Date(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}
