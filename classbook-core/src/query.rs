//! Store-agnostic query construction.
//!
//! The translator produces [`Expr`] trees; every backend turns them into its own
//! native form by implementing [`QueryVisitor`].
//!
//! # Query Building
//!
//! ```ignore
//! use classbook_core::query::{Query, Filter};
//!
//! let query = Query::builder()
//!     .filter(Filter::eq("grade", 5))
//!     .limit(1)
//!     .build();
//! ```
//!
//! # Filter Expression API
//!
//! - Equality: `eq`
//! - Membership: `any_of`
//! - Half-open ranges: `within`
//! - Logical: `and`

use bson::Bson;

use crate::error::StoreError;

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (exact match). Against a list field, a scalar matches any element.
    Eq,
    /// The field equals, or a list field contains, any of the values.
    AnyOf,
}

/// A filter expression for querying documents.
///
/// # Example
///
/// ```ignore
/// use classbook_core::query::Filter;
///
/// let expr = Filter::and(vec![
///     Filter::eq("grade", 5),
///     Filter::any_of("type", vec!["science", "lab"]),
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match). Empty matches everything.
    And(Vec<Expr>),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
    /// Half-open range: `start <= field < end`.
    Range {
        field: String,
        start: Bson,
        end: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// An expression that matches every document.
    pub fn all() -> Self {
        Expr::And(Vec::new())
    }

    /// The field this expression constrains, if it constrains exactly one.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Expr::Field { field, .. } | Expr::Range { field, .. } => Some(field),
            Expr::And(_) => None,
        }
    }
}

/// A structured query for retrieving documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Optional filter expression to match documents.
    pub filter: Option<Expr>,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a new empty query with no filters or limits.
    pub fn new() -> Self {
        Query {
            filter: None,
            limit: None,
        }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }
}

/// Helper struct for constructing filter expressions.
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field equals, or a list field contains, one of `values`.
    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, values.into())
    }

    /// Matches documents where `start <= field < end`.
    pub fn within(field: impl Into<String>, start: impl Into<Bson>, end: impl Into<Bson>) -> Expr {
        Expr::Range {
            field: field.into(),
            start: start.into(),
            end: end.into(),
        }
    }

    /// Combines multiple expressions such that all must match for a document to be included.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Sets the filter expression for this query.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<StoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_range(
        &mut self,
        field: &str,
        start: &Bson,
        end: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
            Expr::Range { field, start, end } => self.visit_range(field, start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_into_existing_conjunction() {
        let expr = Filter::eq("grade", 5)
            .and(Filter::eq("name", "A"))
            .and(Filter::eq("type", "lab"));

        match expr {
            Expr::And(list) => assert_eq!(list.len(), 3),
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn builder_sets_filter_and_limit() {
        let query = Query::builder().filter(Expr::all()).limit(1).build();

        assert_eq!(query.filter, Some(Expr::And(vec![])));
        assert_eq!(query.limit, Some(1));
    }

    #[test]
    fn field_name_reports_single_field_expressions() {
        assert_eq!(Filter::within("date", 1, 2).field_name(), Some("date"));
        assert_eq!(Expr::all().field_name(), None);
    }
}
