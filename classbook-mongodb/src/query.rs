//! Query translation from classbook filter expressions to MongoDB query syntax.

use bson::{Bson, Document, doc};

use classbook_core::{
    error::StoreError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Translates filter expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// The MongoDB filter for an optional expression; none matches everything.
    pub fn filter(expr: Option<&Expr>) -> Result<Document, StoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // `$and` rejects an empty array
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::AnyOf => match value {
                    Bson::Array(values) => doc! { "$in": values },
                    _ => {
                        return Err(StoreError::Backend(format!(
                            "AnyOf on '{field}' requires an array value"
                        )));
                    }
                },
            }
        })
    }

    fn visit_range(
        &mut self,
        field: &str,
        start: &Bson,
        end: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$gte": start, "$lt": end },
        })
    }
}
