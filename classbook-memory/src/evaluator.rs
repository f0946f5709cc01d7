//! Query expression evaluation for in-memory document filtering.
//!
//! Matching follows document-store semantics: a scalar compared against a list
//! field matches when any element does.

use bson::{Bson, DateTime, Document, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use classbook_core::{
    error::{StoreError, StoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that an `Int32` stored by one writer
/// compares equal to an `Int64` produced by the translator.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    ObjectId(ObjectId),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            // Other types are not comparable
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Comparable<'_> {
    /// Whether this stored value matches `value` by equality, looking inside lists.
    fn matches(&self, value: &Comparable<'_>) -> bool {
        match self {
            Comparable::Array(items) if !matches!(value, Comparable::Array(_)) => {
                items.iter().any(|item| item == value)
            }
            _ => self == value,
        }
    }

    fn within(&self, start: &Comparable<'_>, end: &Comparable<'_>) -> bool {
        match self {
            Comparable::Array(items) => items.iter().any(|item| item.within(start, end)),
            _ => {
                matches!(self.partial_cmp(start), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(self.partial_cmp(end), Some(Ordering::Less))
            }
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> StoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Whether `document` matches `filter`; a missing filter matches everything.
    pub fn matches(document: &Document, filter: Option<&Expr>) -> StoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
        }
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.document.get(field) else {
            return Ok(false);
        };
        let stored = Comparable::from(field_value);

        match (op, Comparable::from(value)) {
            (FieldOp::Eq, expected) => Ok(stored.matches(&expected)),
            (FieldOp::AnyOf, Comparable::Array(values)) => {
                Ok(values.iter().any(|candidate| stored.matches(candidate)))
            }
            (FieldOp::AnyOf, other) => Err(StoreError::InvalidDocument(format!(
                "membership on '{field}' needs a list of values, got {other:?}"
            ))),
        }
    }

    fn visit_range(
        &mut self,
        field: &str,
        start: &Bson,
        end: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let (start, end) = (Comparable::from(start), Comparable::from(end));

        Ok(self
            .document
            .get(field)
            .is_some_and(|value| Comparable::from(value).within(&start, &end)))
    }
}
