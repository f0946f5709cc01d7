//! Field declarations, schemas and the closed set of entity kinds.
//!
//! Schemas are plain `static` data: an ordered list of [`FieldDecl`]s per
//! [`EntityKind`]. Nothing is discovered at runtime; the validator and the
//! translator look fields up by name in these tables. The concrete declarations
//! live in [`crate::registry`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::QueryError, registry::SchemaRegistry, value::FieldValue};

/// The semantic type a field's value is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    /// A calendar date, `YYYY-MM-DD`.
    Date,
    /// An ISO-8601 timestamp.
    DateTime,
    /// A calendar date if the value parses as one, otherwise a timestamp.
    DateOrDateTime,
    StringList,
    /// The string form of another document's primary key.
    Reference,
    ReferenceList,
    /// A single reference id or a list of them; a single id becomes a one-element list.
    ReferenceOrList,
}

impl FieldType {
    /// Whether values of this type are lists.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FieldType::StringList | FieldType::ReferenceList | FieldType::ReferenceOrList
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::DateOrDateTime => "date or datetime",
            FieldType::StringList => "list of strings",
            FieldType::Reference => "reference id",
            FieldType::ReferenceList => "list of reference ids",
            FieldType::ReferenceOrList => "reference id or list of reference ids",
        })
    }
}

/// Value filled in for a field that a complete document leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Null,
    EmptyList,
}

impl FieldDefault {
    pub fn value(&self) -> FieldValue {
        match self {
            FieldDefault::Null => FieldValue::Null,
            FieldDefault::EmptyList => FieldValue::List(Vec::new()),
        }
    }
}

/// A value rule checked after type coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Strings of at most this many characters.
    MaxLength(usize),
    /// Numbers within `min..=max`.
    Range { min: f64, max: f64 },
    Email,
    /// At least one uppercase letter, one lowercase letter, one digit and one special symbol.
    Password,
    /// An international number, `+` and country code first, valid for its region.
    Phone,
    /// A list with at least one non-blank entry.
    NonEmpty,
}

/// A single named attribute of a schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub ty: FieldType,
    /// Whether `null` is an accepted value.
    pub optional: bool,
    pub default: Option<FieldDefault>,
    pub constraint: Option<Constraint>,
    /// Hidden from read results unless sensitive data is requested.
    pub sensitive: bool,
}

impl FieldDecl {
    /// Declares a required field with no value rules.
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            optional: false,
            default: None,
            constraint: None,
            sensitive: false,
        }
    }

    /// Accepts `null` and, unless a default is already set, defaults to `null`.
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        if self.default.is_none() {
            self.default = Some(FieldDefault::Null);
        }
        self
    }

    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn constrained(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Whether a complete document must carry this field.
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// An immutable, ordered set of field declarations for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schema {
    kind: EntityKind,
    fields: &'static [FieldDecl],
}

impl Schema {
    pub const fn new(kind: EntityKind, fields: &'static [FieldDecl]) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Declarations in declaration order.
    pub fn fields(&self) -> &'static [FieldDecl] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDecl> {
        self.fields.iter().find(|decl| decl.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|decl| decl.name)
    }

    /// Names of the fields hidden from non-sensitive reads.
    pub fn sensitive_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|decl| decl.sensitive)
            .map(|decl| decl.name)
    }
}

/// The closed set of entity kinds the store knows about.
///
/// Tags from the outside world are parsed with [`FromStr`], which rejects
/// anything that is not a known kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Admin,
    Teacher,
    Student,
    Relative,
    Class,
    Score,
    Attendance,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Admin,
        EntityKind::Teacher,
        EntityKind::Student,
        EntityKind::Relative,
        EntityKind::Class,
        EntityKind::Score,
        EntityKind::Attendance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Admin => "admin",
            EntityKind::Teacher => "teacher",
            EntityKind::Student => "student",
            EntityKind::Relative => "relative",
            EntityKind::Class => "class",
            EntityKind::Score => "score",
            EntityKind::Attendance => "attendance",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Admin => "admins",
            EntityKind::Teacher => "teachers",
            EntityKind::Student => "students",
            EntityKind::Relative => "relatives",
            EntityKind::Class => "classes",
            EntityKind::Score => "scores",
            EntityKind::Attendance => "attendances",
        }
    }

    /// Whether this kind is a user role (as opposed to a record kind).
    pub fn is_user(&self) -> bool {
        matches!(
            self,
            EntityKind::Admin | EntityKind::Teacher | EntityKind::Student | EntityKind::Relative
        )
    }

    pub fn schema(&self) -> &'static Schema {
        SchemaRegistry::lookup(*self)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = QueryError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let tag = tag.trim().to_ascii_lowercase();

        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag || kind.plural() == tag)
            .ok_or(QueryError::UnknownEntity(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singular_and_plural_tags() {
        assert_eq!("teacher".parse::<EntityKind>(), Ok(EntityKind::Teacher));
        assert_eq!("Classes".parse::<EntityKind>(), Ok(EntityKind::Class));
    }

    #[test]
    fn rejects_unknown_tags() {
        assert_eq!(
            "janitor".parse::<EntityKind>(),
            Err(QueryError::UnknownEntity("janitor".into()))
        );
    }

    #[test]
    fn optional_fields_default_to_null() {
        let decl = FieldDecl::new("profile_pic", FieldType::String).optional();

        assert_eq!(decl.default, Some(FieldDefault::Null));
        assert!(!decl.is_required());
    }

    #[test]
    fn explicit_defaults_survive_optional() {
        let decl = FieldDecl::new("details", FieldType::StringList)
            .with_default(FieldDefault::EmptyList)
            .optional();

        assert_eq!(decl.default, Some(FieldDefault::EmptyList));
    }

    #[test]
    fn user_kinds_are_roles() {
        assert!(EntityKind::Relative.is_user());
        assert!(!EntityKind::Attendance.is_user());
    }
}
