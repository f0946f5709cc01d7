//! Translation of validated queries into store queries and updates.
//!
//! Each field is rewritten by the first rule that applies:
//!
//! 1. list value while searching, unless strict: membership ([`Filter::any_of`])
//! 2. date-time while searching: the day-long window `[value, value + 1 day)`
//! 3. calendar date: midnight of that day; a day-long window while searching
//! 4. the reserved `id` field: renamed to `_id`, converted to an `ObjectId`
//! 5. reference fields (`*_id`): converted to `ObjectId`s, element-wise for lists
//! 6. everything else: passed through
//!
//! Reference lists keep their elements converted under rule 1 as well, so that a
//! membership search compares ids with ids.

use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};

use crate::{
    config::search_window,
    error::{QueryError, QueryResult},
    query::{Expr, Filter},
    reference::{ID_FIELD, PRIMARY_KEY, is_reference_field, to_native_ids, to_object_id},
    value::{FieldValue, ValidatedQuery},
};

/// Whether a translation matches documents or writes to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Search,
    Write,
}

/// A "set these fields" update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
}

impl Update {
    /// The fields and values being set.
    pub fn fields(&self) -> &Document {
        &self.set
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// The `$set` update document.
    pub fn to_document(&self) -> Document {
        doc! { "$set": self.set.clone() }
    }
}

impl From<Document> for Update {
    fn from(set: Document) -> Self {
        Self { set }
    }
}

/// The store-native form of a validated query.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    Match(Expr),
    Set(Update),
}

/// Translates a validated query for the given mode.
///
/// `strict` only affects [`Mode::Search`]: it matches list fields by exact value
/// instead of by membership.
///
/// # Errors
///
/// Returns [`QueryError::InvalidReference`] if an id or reference value is not a valid store id.
pub fn translate(query: &ValidatedQuery, mode: Mode, strict: bool) -> QueryResult<Translation> {
    match mode {
        Mode::Search => translate_search(query, strict).map(Translation::Match),
        Mode::Write => translate_write(query).map(Translation::Set),
    }
}

/// Builds the match predicate for a search.
///
/// A single field yields its own predicate, several fields are combined with
/// `And`, and an empty query matches everything.
pub fn translate_search(query: &ValidatedQuery, strict: bool) -> QueryResult<Expr> {
    let mut predicates = query
        .iter()
        .map(|(field, value)| search_predicate(field, value, strict))
        .collect::<QueryResult<Vec<_>>>()?;

    Ok(match predicates.len() {
        1 => predicates.remove(0),
        _ => Expr::And(predicates),
    })
}

/// Builds the `$set` update for a write.
pub fn translate_write(query: &ValidatedQuery) -> QueryResult<Update> {
    Ok(Update {
        set: written_fields(query)?,
    })
}

/// Builds the document to insert for a creation payload.
///
/// The reserved `id` field is dropped; the store assigns the primary key.
pub fn creation_document(query: &ValidatedQuery) -> QueryResult<Document> {
    written_fields(&query.without(ID_FIELD))
}

fn written_fields(query: &ValidatedQuery) -> QueryResult<Document> {
    query
        .iter()
        .map(|(field, value)| match field {
            ID_FIELD => Ok((PRIMARY_KEY.to_string(), primary_key(value)?)),
            _ => Ok((field.to_string(), stored_value(field, value)?)),
        })
        .collect()
}

fn search_predicate(field: &str, value: &FieldValue, strict: bool) -> QueryResult<Expr> {
    match value {
        FieldValue::List(_) if !strict => Ok(Filter::any_of(field, stored_value(field, value)?)),
        FieldValue::DateTime(start) => day_window(field, *start),
        FieldValue::Date(date) => day_window(field, FieldValue::midnight(*date)),
        _ if field == ID_FIELD => Ok(Filter::eq(PRIMARY_KEY, primary_key(value)?)),
        _ => Ok(Filter::eq(field, stored_value(field, value)?)),
    }
}

fn day_window(field: &str, start: DateTime<Utc>) -> QueryResult<Expr> {
    let end = start
        .checked_add_signed(search_window())
        .ok_or_else(|| QueryError::ConstraintViolation {
            field: field.to_string(),
            reason: format!("{start} is too late to search a whole day from"),
        })?;

    Ok(Filter::within(
        field,
        bson::DateTime::from_chrono(start),
        bson::DateTime::from_chrono(end),
    ))
}

fn stored_value(field: &str, value: &FieldValue) -> QueryResult<Bson> {
    let stored = value.to_bson();

    match is_reference_field(field) {
        true => to_native_ids(field, &stored),
        false => Ok(stored),
    }
}

fn primary_key(value: &FieldValue) -> QueryResult<Bson> {
    match value {
        FieldValue::String(text) => Ok(Bson::ObjectId(to_object_id(ID_FIELD, text)?)),
        other => Err(QueryError::InvalidReference {
            field: ID_FIELD.to_string(),
            value: other.to_bson().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{query::FieldOp, schema::EntityKind, validate::validate};
    use bson::oid::ObjectId;
    use serde_json::{Value, json};

    const HEX: &str = "507f1f77bcf86cd799439011";

    fn validated(kind: EntityKind, payload: Value) -> ValidatedQuery {
        validate(kind.schema(), payload.as_object().unwrap()).unwrap()
    }

    fn bson_datetime(text: &str) -> Bson {
        Bson::DateTime(bson::DateTime::parse_rfc3339_str(text).unwrap())
    }

    #[test]
    fn plain_fields_become_exact_matches() {
        let query = validated(EntityKind::Class, json!({ "grade": 5 }));

        assert_eq!(translate_search(&query, false).unwrap(), Filter::eq("grade", 5_i64));
    }

    #[test]
    fn calendar_dates_search_a_whole_day() {
        let query = validated(EntityKind::Attendance, json!({ "date": "2023-11-27" }));

        let expr = translate_search(&query, false).unwrap();

        assert_eq!(
            expr,
            Expr::Range {
                field: "date".into(),
                start: bson_datetime("2023-11-27T00:00:00Z"),
                end: bson_datetime("2023-11-28T00:00:00Z"),
            }
        );
    }

    #[test]
    fn day_window_is_half_open_and_one_day_wide() {
        let query = validated(EntityKind::Teacher, json!({ "birthday": "1990-05-01" }));

        let Expr::Range { start, end, .. } = translate_search(&query, false).unwrap() else {
            panic!("expected a range");
        };
        let (start, end) = (start.as_datetime().unwrap(), end.as_datetime().unwrap());

        assert_eq!(end.timestamp_millis() - start.timestamp_millis(), 86_400_000);
        assert_eq!(start.to_chrono().to_rfc3339(), "1990-05-01T00:00:00+00:00");
    }

    #[test]
    fn datetimes_search_a_day_from_the_instant() {
        let query = validated(EntityKind::Score, json!({ "date": "2023-11-27T10:30:00Z" }));

        let expr = translate_search(&query, false).unwrap();

        assert_eq!(
            expr,
            Filter::within(
                "date",
                bson_datetime("2023-11-27T10:30:00Z"),
                bson_datetime("2023-11-28T10:30:00Z"),
            )
        );
    }

    #[test]
    fn windows_past_the_calendar_end_are_rejected() {
        let query = ValidatedQuery::new(
            EntityKind::Attendance,
            vec![("date", FieldValue::Date(chrono::NaiveDate::MAX))],
        );

        assert!(matches!(
            translate_search(&query, false),
            Err(QueryError::ConstraintViolation { ref field, .. }) if field == "date"
        ));
    }

    #[test]
    fn identifier_becomes_the_primary_key() {
        let query = validated(EntityKind::Class, json!({ "id": HEX }));

        assert_eq!(
            translate_search(&query, false).unwrap(),
            Filter::eq("_id", ObjectId::parse_str(HEX).unwrap())
        );
    }

    #[test]
    fn invalid_identifier_is_an_invalid_reference() {
        let query = validated(EntityKind::Class, json!({ "id": "nope" }));

        assert!(matches!(
            translate_search(&query, false),
            Err(QueryError::InvalidReference { ref field, .. }) if field == "id"
        ));
    }

    #[test]
    fn lists_match_by_membership_unless_strict() {
        let query = validated(EntityKind::Class, json!({ "type": ["a", "b"] }));

        assert_eq!(
            translate_search(&query, false).unwrap(),
            Filter::any_of("type", vec!["a", "b"])
        );
        assert_eq!(
            translate_search(&query, true).unwrap(),
            Filter::eq("type", vec!["a", "b"])
        );
    }

    #[test]
    fn reference_lists_convert_inside_membership() {
        let query = validated(EntityKind::Class, json!({ "students_id": [HEX] }));

        let Expr::Field { op, value, .. } = translate_search(&query, false).unwrap() else {
            panic!("expected a field predicate");
        };

        assert_eq!(op, FieldOp::AnyOf);
        assert_eq!(value, Bson::Array(vec![Bson::ObjectId(ObjectId::parse_str(HEX).unwrap())]));
    }

    #[test]
    fn single_score_students_search_by_membership() {
        let query = validated(EntityKind::Score, json!({ "students_id": HEX }));

        assert_eq!(
            translate_search(&query, false).unwrap(),
            Filter::any_of("students_id", vec![ObjectId::parse_str(HEX).unwrap()])
        );
        assert_eq!(
            translate_write(&query).unwrap().fields().get_array("students_id").unwrap().len(),
            1
        );
    }

    #[test]
    fn single_references_convert() {
        let query = validated(EntityKind::Score, json!({ "teacher_id": HEX }));

        assert_eq!(
            translate_search(&query, false).unwrap(),
            Filter::eq("teacher_id", ObjectId::parse_str(HEX).unwrap())
        );
    }

    #[test]
    fn invalid_references_name_the_field() {
        let query = validated(EntityKind::Attendance, json!({ "student_id": "123" }));

        let err = translate_search(&query, false).unwrap_err();

        assert_eq!(
            err,
            QueryError::InvalidReference {
                field: "student_id".into(),
                value: "123".into(),
            }
        );
    }

    #[test]
    fn several_fields_are_combined() {
        let query = validated(EntityKind::Class, json!({ "name": "A", "grade": 1 }));

        assert_eq!(
            translate_search(&query, false).unwrap(),
            Filter::and([Filter::eq("name", "A"), Filter::eq("grade", 1_i64)])
        );
    }

    #[test]
    fn empty_queries_match_everything() {
        let query = validated(EntityKind::Class, json!({}));

        assert_eq!(translate_search(&query, false).unwrap(), Expr::all());
    }

    #[test]
    fn writes_store_plain_values() {
        let query = validated(
            EntityKind::Attendance,
            json!({ "date": "2023-11-27", "details": ["late"], "class_id": HEX }),
        );

        let update = translate_write(&query).unwrap();

        assert_eq!(
            update.to_document(),
            doc! {
                "$set": {
                    "class_id": ObjectId::parse_str(HEX).unwrap(),
                    "date": bson_datetime("2023-11-27T00:00:00Z"),
                    "details": ["late"],
                }
            }
        );
    }

    #[test]
    fn writes_keep_datetimes_exact() {
        let query = validated(EntityKind::Score, json!({ "date": "2023-11-27T10:30:00Z" }));

        let Translation::Set(update) = translate(&query, Mode::Write, false).unwrap() else {
            panic!("expected an update");
        };

        assert_eq!(update.fields().get("date"), Some(&bson_datetime("2023-11-27T10:30:00Z")));
    }

    #[test]
    fn creation_strips_the_identifier() {
        let query = validated(
            EntityKind::Class,
            json!({ "id": HEX, "name": "A", "students_id": [] }),
        );

        let document = creation_document(&query).unwrap();

        assert!(!document.contains_key("id"));
        assert!(!document.contains_key("_id"));
        assert_eq!(document.get_array("students_id").unwrap().len(), 0);
    }

    #[test]
    fn search_mode_dispatches_to_a_match() {
        let query = validated(EntityKind::Class, json!({ "grade": 5 }));

        assert!(matches!(translate(&query, Mode::Search, false), Ok(Translation::Match(_))));
    }
}
