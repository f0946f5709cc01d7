//! Conversion between application-facing ids and store-native [`ObjectId`]s.
//!
//! Payloads name a document's own key [`ID_FIELD`] and hold it as a hex string;
//! the store keeps it under [`PRIMARY_KEY`] as an `ObjectId`. Fields whose name
//! ends in `_id` point at other documents and are stored as `ObjectId`s as well.

use bson::{Bson, Document, oid::ObjectId};

use crate::error::{QueryError, QueryResult};

/// The reserved identifier field of application-facing payloads.
pub const ID_FIELD: &str = "id";

/// The store's primary-key field.
pub const PRIMARY_KEY: &str = "_id";

const REFERENCE_SUFFIX: &str = "_id";

/// Whether `name` follows the naming convention of a field pointing at another document.
///
/// The reserved identifier field and the primary key are not references.
pub fn is_reference_field(name: &str) -> bool {
    name != ID_FIELD
        && name != PRIMARY_KEY
        && name.len() > REFERENCE_SUFFIX.len()
        && name.ends_with(REFERENCE_SUFFIX)
}

/// Parses the hex form of a store id.
///
/// # Errors
///
/// Returns [`QueryError::InvalidReference`] naming `field` if `value` is not a valid id.
pub fn to_object_id(field: &str, value: &str) -> QueryResult<ObjectId> {
    ObjectId::parse_str(value).map_err(|_| QueryError::InvalidReference {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Converts a reference value, or every element of a list of them, to store ids.
///
/// `null` stays `null`; an existing `ObjectId` is kept.
pub fn to_native_ids(field: &str, value: &Bson) -> QueryResult<Bson> {
    match value {
        Bson::String(text) => Ok(Bson::ObjectId(to_object_id(field, text)?)),
        Bson::Array(items) => Ok(Bson::Array(
            items
                .iter()
                .map(|item| to_native_ids(field, item))
                .collect::<QueryResult<Vec<_>>>()?,
        )),
        Bson::ObjectId(_) | Bson::Null => Ok(value.clone()),
        other => Err(QueryError::InvalidReference {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

fn to_display_ids(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(id) => Bson::String(id.to_hex()),
        Bson::Array(items) => Bson::Array(items.into_iter().map(to_display_ids).collect()),
        other => other,
    }
}

/// Converts a document read from the store into its application-facing form.
///
/// The primary key is renamed to [`ID_FIELD`] and, like every reference field,
/// converted to its hex string. Applying this twice gives the same result as
/// applying it once.
pub fn stringify(document: Document) -> Document {
    document
        .into_iter()
        .map(|(key, value)| {
            if key == PRIMARY_KEY {
                (ID_FIELD.to_string(), to_display_ids(value))
            } else if is_reference_field(&key) {
                (key, to_display_ids(value))
            } else {
                (key, value)
            }
        })
        .collect()
}

/// Removes the named fields from a document.
pub fn hide_fields<'a>(
    mut document: Document,
    names: impl IntoIterator<Item = &'a str>,
) -> Document {
    for name in names {
        document.remove(name);
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    const HEX: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn reference_fields_follow_the_suffix_convention() {
        assert!(is_reference_field("teacher_id"));
        assert!(is_reference_field("students_id"));
        assert!(!is_reference_field("id"));
        assert!(!is_reference_field("_id"));
        assert!(!is_reference_field("grade"));
    }

    #[test]
    fn invalid_hex_is_an_invalid_reference() {
        let err = to_object_id("teacher_id", "not-an-id").unwrap_err();

        assert_eq!(
            err,
            QueryError::InvalidReference {
                field: "teacher_id".into(),
                value: "not-an-id".into(),
            }
        );
    }

    #[test]
    fn lists_convert_element_wise() {
        let ids = Bson::Array(vec![Bson::String(HEX.into())]);

        let converted = to_native_ids("students_id", &ids).unwrap();

        assert_eq!(
            converted,
            Bson::Array(vec![Bson::ObjectId(ObjectId::parse_str(HEX).unwrap())])
        );
    }

    #[test]
    fn stringify_renames_the_primary_key() {
        let id = ObjectId::parse_str(HEX).unwrap();

        let document = stringify(doc! {
            "_id": id,
            "teacher_id": id,
            "students_id": [id],
            "name": "A",
        });

        assert_eq!(
            document,
            doc! { "id": HEX, "teacher_id": HEX, "students_id": [HEX], "name": "A" }
        );
    }

    #[test]
    fn stringify_is_idempotent() {
        let id = ObjectId::new();
        let original = doc! { "_id": id, "class_id": id, "details": ["x"], "grade": 3 };

        let once = stringify(original);
        let twice = stringify(once.clone());

        assert_eq!(once, twice);
    }

    #[test]
    fn reference_round_trip_preserves_the_string() {
        let native = to_native_ids("teacher_id", &Bson::String(HEX.into())).unwrap();

        let document = stringify(doc! { "teacher_id": native });

        assert_eq!(document.get_str("teacher_id").unwrap(), HEX);
    }

    #[test]
    fn hide_fields_removes_named_keys() {
        let document = hide_fields(
            doc! { "name": "A", "password": "x", "phone": "y" },
            ["password", "phone"],
        );

        assert_eq!(document, doc! { "name": "A" });
    }
}
