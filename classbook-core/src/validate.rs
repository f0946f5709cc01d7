//! Schema validation of raw request payloads.
//!
//! [`validate`] checks a flat key-value payload against a [`Schema`]: unknown keys
//! are rejected as a whole, every present value is coerced to its declared type and
//! checked against its value rule. Nothing is partially applied; the first failure
//! fails the call.
//!
//! | Declared type | Accepted input |
//! |---|---|
//! | integer | JSON integer, integral float, or a base-10 string |
//! | float | JSON number or a numeric string |
//! | boolean | `"true"`, `"1"`, `"yes"` in any case; other strings false; others by truthiness |
//! | datetime | ISO-8601 string, with or without offset (UTC assumed) |
//! | date | `YYYY-MM-DD` string |
//! | date or datetime | date first, then datetime |
//! | lists | JSON array of strings, or a string holding one |
//! | reference or list | as lists; a single id string becomes a one-element list |
//! | string, reference | string, number or boolean (stringified) |

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use email_address::{EmailAddress, Options};
use serde_json::Value;

use crate::{
    config::{MAX_YEAR, MIN_YEAR},
    error::{QueryError, QueryResult},
    schema::{Constraint, FieldDecl, FieldType, Schema},
    value::{FieldValue, RawQuery, ValidatedQuery},
};

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+{}[]:;<>,.?~";

const WEAK_PASSWORD: &str = "must contain at least one uppercase and lowercase letter, \
    one special character, and one number";

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Validates a search or update payload.
///
/// Only the fields present in `data` are validated and returned; absent fields stay absent.
///
/// # Errors
///
/// - [`QueryError::UnknownField`] if `data` holds keys the schema does not declare
/// - [`QueryError::TypeMismatch`] if a value cannot be coerced
/// - [`QueryError::ConstraintViolation`] if a coerced value breaks its value rule
pub fn validate(schema: &Schema, data: &RawQuery) -> QueryResult<ValidatedQuery> {
    reject_unknown_fields(schema, data)?;

    let fields = schema
        .fields()
        .iter()
        .filter_map(|decl| {
            data.get(decl.name)
                .map(|value| coerce(decl, value).map(|coerced| (decl.name, coerced)))
        })
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(ValidatedQuery::new(schema.kind(), fields))
}

/// Validates a complete document for creation.
///
/// Applies the same rules as [`validate`], then requires every mandatory field and
/// fills declared defaults for the rest.
///
/// # Errors
///
/// Everything [`validate`] returns, plus [`QueryError::MissingField`].
pub fn validate_document(schema: &Schema, data: &RawQuery) -> QueryResult<ValidatedQuery> {
    reject_unknown_fields(schema, data)?;

    let mut fields = Vec::with_capacity(schema.fields().len());

    for decl in schema.fields() {
        match (data.get(decl.name), decl.default) {
            (Some(value), _) => fields.push((decl.name, coerce(decl, value)?)),
            (None, Some(default)) => fields.push((decl.name, default.value())),
            (None, None) => return Err(QueryError::MissingField(decl.name.to_string())),
        }
    }

    Ok(ValidatedQuery::new(schema.kind(), fields))
}

fn reject_unknown_fields(schema: &Schema, data: &RawQuery) -> QueryResult<()> {
    let mut unknown = data
        .keys()
        .filter(|key| schema.field(key).is_none())
        .cloned()
        .collect::<Vec<_>>();

    if unknown.is_empty() {
        return Ok(());
    }

    unknown.sort();

    Err(QueryError::UnknownField {
        unknown,
        allowed: schema.field_names().map(str::to_string).collect(),
    })
}

fn coerce(decl: &FieldDecl, value: &Value) -> QueryResult<FieldValue> {
    if value.is_null() {
        return match decl.optional {
            true => Ok(FieldValue::Null),
            false => Err(mismatch(decl, "null is not allowed".to_string())),
        };
    }

    let coerced = match decl.ty {
        FieldType::String | FieldType::Reference => coerce_string(value),
        FieldType::Integer => coerce_integer(value),
        FieldType::Float => coerce_float(value),
        FieldType::Boolean => Ok(FieldValue::Bool(coerce_bool(value))),
        FieldType::Date => as_str(value).and_then(parse_date).map(FieldValue::Date),
        FieldType::DateTime => as_str(value).and_then(parse_datetime).map(FieldValue::DateTime),
        FieldType::DateOrDateTime => as_str(value).and_then(|text| {
            parse_date(text)
                .map(FieldValue::Date)
                .or_else(|_| parse_datetime(text).map(FieldValue::DateTime))
        }),
        FieldType::StringList | FieldType::ReferenceList => coerce_list(value),
        FieldType::ReferenceOrList => coerce_one_or_many(value),
    }
    .map_err(|reason| mismatch(decl, reason))?;

    check_constraint(decl, &coerced)?;

    Ok(coerced)
}

fn mismatch(decl: &FieldDecl, reason: String) -> QueryError {
    QueryError::TypeMismatch {
        field: decl.name.to_string(),
        expected: decl.ty,
        reason,
    }
}

fn as_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {value}"))
}

fn coerce_string(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::String(text) => Ok(FieldValue::String(text.clone())),
        Value::Number(number) => Ok(FieldValue::String(number.to_string())),
        Value::Bool(flag) => Ok(FieldValue::String(flag.to_string())),
        other => Err(format!("cannot convert {other} to a string")),
    }
}

fn coerce_integer(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            })
            .map(FieldValue::Int)
            .ok_or_else(|| format!("{number} is not an integer")),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| format!("'{text}' is not a base-10 integer")),
        other => Err(format!("{other} is not an integer")),
    }
}

fn coerce_float(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| format!("{number} is not a float")),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| format!("'{text}' is not a number")),
        other => Err(format!("{other} is not a number")),
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|float| float != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|err| format!("'{text}' is not a YYYY-MM-DD date: {err}"))
        .and_then(|date| within_years(text, date))
}

fn within_years<D: Datelike>(text: &str, date: D) -> Result<D, String> {
    match (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        true => Ok(date),
        false => Err(format!("'{text}' is outside the years {MIN_YEAR} to {MAX_YEAR}")),
    }
}

fn parse_datetime(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return within_years(text, parsed.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return within_years(text, naive.and_utc());
    }

    match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(_) => parse_date(text).map(FieldValue::midnight),
        Err(_) => Err(format!("'{text}' is not an ISO-8601 timestamp")),
    }
}

fn coerce_list(value: &Value) -> Result<FieldValue, String> {
    let parsed;
    let items = match value {
        Value::Array(items) => items,
        Value::String(text) => {
            parsed = serde_json::from_str::<Value>(text)
                .map_err(|_| format!("'{text}' is not a JSON array"))?;
            parsed
                .as_array()
                .ok_or_else(|| format!("'{text}' is not a JSON array"))?
        }
        other => return Err(format!("{other} is not a list")),
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| format!("list element {item} is not a string"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::List)
}

fn coerce_one_or_many(value: &Value) -> Result<FieldValue, String> {
    match value {
        Value::String(text) if !text.trim_start().starts_with('[') => {
            Ok(FieldValue::List(vec![text.clone()]))
        }
        other => coerce_list(other),
    }
}

fn check_constraint(decl: &FieldDecl, value: &FieldValue) -> QueryResult<()> {
    let Some(constraint) = decl.constraint else {
        return Ok(());
    };

    let violation = match (constraint, value) {
        (_, FieldValue::Null) => None,
        (Constraint::MaxLength(max), FieldValue::String(text)) if text.chars().count() > max => {
            Some(format!("must not be more than {max} characters"))
        }
        (Constraint::Range { min, max }, FieldValue::Int(number)) => {
            out_of_range(*number as f64, min, max)
        }
        (Constraint::Range { min, max }, FieldValue::Float(number)) => {
            out_of_range(*number, min, max)
        }
        (Constraint::Email, FieldValue::String(text)) if !is_email(text) => {
            Some(format!("'{text}' is not a valid email address"))
        }
        (Constraint::Password, FieldValue::String(text)) if !is_strong_password(text) => {
            Some(WEAK_PASSWORD.to_string())
        }
        (Constraint::Phone, FieldValue::String(text)) if !is_phone(text) => {
            Some(format!("'{text}' is not a valid international phone number"))
        }
        (Constraint::NonEmpty, FieldValue::List(items))
            if items.iter().all(|item| item.trim().is_empty()) =>
        {
            Some("must hold at least one entry".to_string())
        }
        _ => None,
    };

    match violation {
        Some(reason) => Err(QueryError::ConstraintViolation {
            field: decl.name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn out_of_range(number: f64, min: f64, max: f64) -> Option<String> {
    (!(min..=max).contains(&number)).then(|| format!("must be between {min} and {max}"))
}

fn is_email(text: &str) -> bool {
    let options = Options::default()
        .with_required_tld()
        .without_display_text()
        .without_domain_literal();

    EmailAddress::parse_with_options(text, options)
        .is_ok_and(|email| email.domain().split('.').all(is_hostname_label))
}

fn is_hostname_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_alphanumeric() || c == '-')
}

fn is_strong_password(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_uppercase())
        && text.chars().any(|c| c.is_ascii_lowercase())
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

fn is_phone(text: &str) -> bool {
    phonenumber::parse(None, text.trim()).is_ok_and(|number| phonenumber::is_valid(&number))
}
