//! The static schema registry.
//!
//! Every entity kind maps to exactly one [`Schema`] built at compile time.

use crate::{
    config::{MAX_GRADE, MAX_NAME_LENGTH, MAX_SCORE, MIN_GRADE, MIN_SCORE},
    error::QueryResult,
    reference::ID_FIELD,
    schema::{Constraint, EntityKind, FieldDecl, FieldDefault, FieldType, Schema},
};

const NAME: Constraint = Constraint::MaxLength(MAX_NAME_LENGTH);
const GRADE: Constraint = Constraint::Range { min: MIN_GRADE, max: MAX_GRADE };
const MARK: Constraint = Constraint::Range { min: MIN_SCORE, max: MAX_SCORE };

/// Expands to the field list shared by every user role, followed by `$extra`.
macro_rules! user_fields {
    ($($extra:expr),* $(,)?) => {
        &[
            FieldDecl::new(ID_FIELD, FieldType::Reference).optional(),
            FieldDecl::new("name", FieldType::String).constrained(NAME),
            FieldDecl::new("surname", FieldType::String).constrained(NAME),
            FieldDecl::new("birthday", FieldType::DateOrDateTime),
            FieldDecl::new("details", FieldType::StringList).with_default(FieldDefault::EmptyList),
            FieldDecl::new("profile_pic", FieldType::String).optional(),
            FieldDecl::new("email", FieldType::String).constrained(Constraint::Email),
            FieldDecl::new("password", FieldType::String)
                .constrained(Constraint::Password)
                .sensitive(),
            FieldDecl::new("phone", FieldType::String)
                .constrained(Constraint::Phone)
                .sensitive(),
            $($extra,)*
        ]
    };
}

const ADMIN_FIELDS: &[FieldDecl] = user_fields![];

const TEACHER_FIELDS: &[FieldDecl] = user_fields![
    FieldDecl::new("subjects", FieldType::StringList).constrained(Constraint::NonEmpty),
];

const STUDENT_FIELDS: &[FieldDecl] = user_fields![
    FieldDecl::new("relatives_id", FieldType::ReferenceList).with_default(FieldDefault::EmptyList),
    FieldDecl::new("teachers_id", FieldType::ReferenceList).with_default(FieldDefault::EmptyList),
];

const RELATIVE_FIELDS: &[FieldDecl] = user_fields![
    FieldDecl::new("children_id", FieldType::ReferenceList).with_default(FieldDefault::EmptyList),
];

const CLASS_FIELDS: &[FieldDecl] = &[
    FieldDecl::new(ID_FIELD, FieldType::Reference).optional(),
    FieldDecl::new("name", FieldType::String).constrained(NAME),
    FieldDecl::new("grade", FieldType::Integer).constrained(GRADE),
    FieldDecl::new("students_id", FieldType::ReferenceList)
        .with_default(FieldDefault::EmptyList)
        .optional(),
    FieldDecl::new("teachers_id", FieldType::ReferenceList)
        .with_default(FieldDefault::EmptyList)
        .optional(),
    FieldDecl::new("details", FieldType::StringList)
        .with_default(FieldDefault::EmptyList)
        .optional(),
    FieldDecl::new("type", FieldType::StringList)
        .with_default(FieldDefault::EmptyList)
        .optional(),
    FieldDecl::new("creation", FieldType::DateTime),
];

const SCORE_FIELDS: &[FieldDecl] = &[
    FieldDecl::new(ID_FIELD, FieldType::Reference).optional(),
    FieldDecl::new("classes", FieldType::Float).constrained(MARK),
    FieldDecl::new("breaks", FieldType::Float).constrained(MARK),
    FieldDecl::new("date", FieldType::DateTime),
    FieldDecl::new("details", FieldType::StringList)
        .with_default(FieldDefault::EmptyList)
        .optional(),
    FieldDecl::new("teacher_id", FieldType::Reference).optional(),
    FieldDecl::new("students_id", FieldType::ReferenceOrList),
    FieldDecl::new("creation", FieldType::DateTime),
];

const ATTENDANCE_FIELDS: &[FieldDecl] = &[
    FieldDecl::new(ID_FIELD, FieldType::Reference).optional(),
    FieldDecl::new("class_id", FieldType::Reference),
    FieldDecl::new("student_id", FieldType::Reference),
    FieldDecl::new("date", FieldType::Date),
    FieldDecl::new("present", FieldType::Boolean),
    FieldDecl::new("details", FieldType::StringList)
        .with_default(FieldDefault::EmptyList)
        .optional(),
    FieldDecl::new("creation", FieldType::DateTime),
];

static ADMIN: Schema = Schema::new(EntityKind::Admin, ADMIN_FIELDS);
static TEACHER: Schema = Schema::new(EntityKind::Teacher, TEACHER_FIELDS);
static STUDENT: Schema = Schema::new(EntityKind::Student, STUDENT_FIELDS);
static RELATIVE: Schema = Schema::new(EntityKind::Relative, RELATIVE_FIELDS);
static CLASS: Schema = Schema::new(EntityKind::Class, CLASS_FIELDS);
static SCORE: Schema = Schema::new(EntityKind::Score, SCORE_FIELDS);
static ATTENDANCE: Schema = Schema::new(EntityKind::Attendance, ATTENDANCE_FIELDS);

/// Lookup table from entity kind to its schema.
pub struct SchemaRegistry;

impl SchemaRegistry {
    pub fn lookup(kind: EntityKind) -> &'static Schema {
        match kind {
            EntityKind::Admin => &ADMIN,
            EntityKind::Teacher => &TEACHER,
            EntityKind::Student => &STUDENT,
            EntityKind::Relative => &RELATIVE,
            EntityKind::Class => &CLASS,
            EntityKind::Score => &SCORE,
            EntityKind::Attendance => &ATTENDANCE,
        }
    }

    /// Resolves an external tag such as `"teacher"` or `"classes"`.
    pub fn lookup_tag(tag: &str) -> QueryResult<&'static Schema> {
        Ok(Self::lookup(tag.parse()?))
    }

    pub fn all() -> impl Iterator<Item = &'static Schema> {
        EntityKind::ALL.into_iter().map(Self::lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use std::collections::HashSet;

    #[test]
    fn every_kind_resolves_to_its_own_schema() {
        for kind in EntityKind::ALL {
            assert_eq!(SchemaRegistry::lookup(kind).kind(), kind);
        }
    }

    #[test]
    fn field_names_are_unique_per_schema() {
        for schema in SchemaRegistry::all() {
            let names = schema.field_names().collect::<Vec<_>>();
            let unique = names.iter().collect::<HashSet<_>>();

            assert_eq!(names.len(), unique.len(), "duplicate field in {}", schema.kind());
        }
    }

    #[test]
    fn every_schema_declares_the_identifier() {
        for schema in SchemaRegistry::all() {
            let id = schema.field(ID_FIELD).unwrap();
            assert!(id.optional);
        }
    }

    #[test]
    fn only_user_schemas_carry_sensitive_fields() {
        for schema in SchemaRegistry::all() {
            let sensitive = schema.sensitive_fields().collect::<Vec<_>>();

            if schema.kind().is_user() {
                assert_eq!(sensitive, vec!["password", "phone"]);
            } else {
                assert!(sensitive.is_empty());
            }
        }
    }

    #[test]
    fn teacher_schema_extends_the_user_fields() {
        let teacher = SchemaRegistry::lookup_tag("teachers").unwrap();

        assert_eq!(teacher.field("subjects").unwrap().ty, FieldType::StringList);
        assert!(teacher.field("email").is_some());
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(matches!(
            SchemaRegistry::lookup_tag("parents"),
            Err(QueryError::UnknownEntity(_))
        ));
    }
}
