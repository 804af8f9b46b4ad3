//! Operator vocabulary per data type and filter operand checks.
//!
//! Operand checks dispatch on the field's [`DataType`], never on the shape the
//! value happened to arrive in: `"100"` is a valid number operand and `100` is
//! not a valid date.

use api_types::{
    metadata::{DataType, FieldMetadata},
    report::{FilterOperator, FilterValue, ScalarValue},
};
use chrono::{DateTime, NaiveDate};

use FilterOperator::*;

const COMMON: &[FilterOperator] = &[Equals, NotEquals, IsNull, IsNotNull];

const STRING: &[FilterOperator] = &[
    Equals, NotEquals, IsNull, IsNotNull, Contains, StartsWith, EndsWith, In, NotIn,
];

const ORDERED: &[FilterOperator] = &[
    Equals,
    NotEquals,
    IsNull,
    IsNotNull,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    In,
    NotIn,
];

const ENUM: &[FilterOperator] = &[Equals, NotEquals, In, NotIn, IsNull, IsNotNull];

/// Legal operators for `data_type`, in the order they are offered.
pub fn operators_for_type(data_type: DataType) -> &'static [FilterOperator] {
    match data_type {
        DataType::String => STRING,
        DataType::Number | DataType::Date => ORDERED,
        DataType::Enum => ENUM,
        DataType::Boolean => COMMON,
    }
}

/// The operator a filter gets when it is pointed at a field of `data_type`.
pub fn default_operator(data_type: DataType) -> FilterOperator {
    operators_for_type(data_type)
        .first()
        .copied()
        .unwrap_or(Equals)
}

pub fn is_operator_allowed(data_type: DataType, operator: FilterOperator) -> bool {
    operators_for_type(data_type).contains(&operator)
}

/// Operand arity required by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    None,
    Single,
    Pair,
    List,
}

pub fn value_shape(operator: FilterOperator) -> ValueShape {
    match operator {
        IsNull | IsNotNull => ValueShape::None,
        Between => ValueShape::Pair,
        In | NotIn => ValueShape::List,
        _ => ValueShape::Single,
    }
}

type ScalarCheck = fn(&ScalarValue, &FieldMetadata) -> Result<(), String>;

fn scalar_check(data_type: DataType) -> ScalarCheck {
    match data_type {
        DataType::String => check_string,
        DataType::Number => check_number,
        DataType::Date => check_date,
        DataType::Boolean => check_boolean,
        DataType::Enum => check_enum,
    }
}

fn check_string(value: &ScalarValue, _: &FieldMetadata) -> Result<(), String> {
    match value {
        ScalarValue::Text(text) if !text.trim().is_empty() => Ok(()),
        ScalarValue::Text(_) => Err("text must not be empty".to_string()),
        other => Err(format!("expected text, got {}", describe(other))),
    }
}

fn check_number(value: &ScalarValue, _: &FieldMetadata) -> Result<(), String> {
    let parsed = match value {
        ScalarValue::Number(number) => Some(*number),
        ScalarValue::Text(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(number) if number.is_finite() => Ok(()),
        _ => Err(format!("expected a number, got {}", describe(value))),
    }
}

fn check_date(value: &ScalarValue, _: &FieldMetadata) -> Result<(), String> {
    let ScalarValue::Text(text) = value else {
        return Err(format!("expected a date, got {}", describe(value)));
    };
    let text = text.trim();
    if NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(text).is_ok()
    {
        return Ok(());
    }
    Err(format!("\"{text}\" is not a date (expected YYYY-MM-DD)"))
}

fn check_boolean(value: &ScalarValue, _: &FieldMetadata) -> Result<(), String> {
    match value {
        ScalarValue::Bool(_) => Ok(()),
        ScalarValue::Text(text) if matches!(text.trim(), "true" | "false") => Ok(()),
        other => Err(format!("expected true or false, got {}", describe(other))),
    }
}

fn check_enum(value: &ScalarValue, meta: &FieldMetadata) -> Result<(), String> {
    let ScalarValue::Text(text) = value else {
        return Err(format!("expected one of the listed values, got {}", describe(value)));
    };
    match &meta.enum_values {
        Some(allowed) if !allowed.iter().any(|v| v == text) => Err(format!(
            "\"{text}\" is not one of {}",
            allowed.join(", ")
        )),
        _ => Ok(()),
    }
}

fn describe(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "nothing".to_string(),
        ScalarValue::Bool(b) => b.to_string(),
        ScalarValue::Number(n) => n.to_string(),
        ScalarValue::Text(t) => format!("\"{t}\""),
    }
}

/// Check that `value` fits `operator` on the field described by `meta`.
///
/// A `between` with a missing or null bound is rejected.
pub fn check_operand(
    meta: &FieldMetadata,
    operator: FilterOperator,
    value: Option<&FilterValue>,
) -> Result<(), String> {
    let check = scalar_check(meta.data_type);
    match (value_shape(operator), value) {
        (ValueShape::None, None) => Ok(()),
        (ValueShape::None, Some(_)) => Err(format!("{operator} takes no value")),
        (_, None) => Err(format!("{operator} requires a value")),
        (ValueShape::Single, Some(FilterValue::One(scalar))) => check(scalar, meta),
        (ValueShape::Single, Some(FilterValue::Many(_))) => {
            Err(format!("{operator} takes a single value"))
        }
        (ValueShape::Pair, Some(FilterValue::Many(bounds))) if bounds.len() == 2 => {
            if bounds.iter().any(|b| *b == ScalarValue::Null) {
                return Err("between requires both bounds".to_string());
            }
            bounds.iter().try_for_each(|bound| check(bound, meta))
        }
        (ValueShape::Pair, Some(_)) => Err("between requires both bounds".to_string()),
        (ValueShape::List, Some(FilterValue::Many(items))) if !items.is_empty() => {
            items.iter().try_for_each(|item| check(item, meta))
        }
        (ValueShape::List, Some(_)) => Err(format!("{operator} requires a non-empty list")),
    }
}
