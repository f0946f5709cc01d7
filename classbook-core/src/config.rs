//! Configuration constants and runtime service configuration.
//!
//! Value rules shared by the schema declarations are compile-time constants.
//! Runtime settings live in [`ServiceConfig`], which can be deserialized with serde
//! or read from the environment with [`ServiceConfig::from_env`].

use chrono::Duration;
use serde::Deserialize;

use crate::schema::EntityKind;

/// Maximum number of characters in a name or surname.
pub const MAX_NAME_LENGTH: usize = 200;

/// Lowest school grade a class can belong to.
pub const MIN_GRADE: f64 = 1.0;

/// Highest school grade a class can belong to.
pub const MAX_GRADE: f64 = 12.0;

/// Lowest mark a score field accepts.
pub const MIN_SCORE: f64 = 0.0;

/// Highest mark a score field accepts.
pub const MAX_SCORE: f64 = 10.0;

/// Earliest year a date or date-time field accepts.
pub const MIN_YEAR: i32 = 1;

/// Latest year a date or date-time field accepts.
pub const MAX_YEAR: i32 = 9999;

/// Width of the half-open window used when searching a date or date-time field.
pub fn search_window() -> Duration {
    Duration::days(1)
}

/// Prefix of every environment variable read by [`ServiceConfig::from_env`].
pub const ENV_PREFIX: &str = "CLASSBOOK";

/// Collection name used for every entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub admins: String,
    pub teachers: String,
    pub students: String,
    pub relatives: String,
    pub classes: String,
    pub scores: String,
    pub attendances: String,
}

impl CollectionNames {
    /// Returns the collection holding documents of `kind`.
    pub fn get(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Admin => &self.admins,
            EntityKind::Teacher => &self.teachers,
            EntityKind::Student => &self.students,
            EntityKind::Relative => &self.relatives,
            EntityKind::Class => &self.classes,
            EntityKind::Score => &self.scores,
            EntityKind::Attendance => &self.attendances,
        }
    }

    fn get_mut(&mut self, kind: EntityKind) -> &mut String {
        match kind {
            EntityKind::Admin => &mut self.admins,
            EntityKind::Teacher => &mut self.teachers,
            EntityKind::Student => &mut self.students,
            EntityKind::Relative => &mut self.relatives,
            EntityKind::Class => &mut self.classes,
            EntityKind::Score => &mut self.scores,
            EntityKind::Attendance => &mut self.attendances,
        }
    }
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            admins: "admins".to_string(),
            teachers: "teachers".to_string(),
            students: "students".to_string(),
            relatives: "relatives".to_string(),
            classes: "classes".to_string(),
            scores: "scores".to_string(),
            attendances: "attendances".to_string(),
        }
    }
}

/// Runtime configuration for a [`DataService`](crate::service::DataService).
///
/// # Example
///
/// ```ignore
/// use classbook_core::config::ServiceConfig;
///
/// let config: ServiceConfig = serde_json::from_str(r#"{ "strict_lists": true }"#)?;
/// assert_eq!(config.collections.classes, "classes");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Default list semantics for searches that do not choose explicitly.
    ///
    /// `false` matches list fields by membership, `true` requires the whole list to match.
    pub strict_lists: bool,
    /// Collection names per entity kind.
    pub collections: CollectionNames,
}

impl ServiceConfig {
    /// Builds a configuration from `CLASSBOOK_*` environment variables.
    ///
    /// `CLASSBOOK_STRICT_LISTS` accepts `true`/`1`/`yes` (case-insensitive).
    /// `CLASSBOOK_<KIND>_COLLECTION` (for example `CLASSBOOK_TEACHERS_COLLECTION`)
    /// overrides a collection name. Unset variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(&format!("{ENV_PREFIX}_STRICT_LISTS")) {
            config.strict_lists = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            );
        }

        for kind in EntityKind::ALL {
            let key = format!(
                "{ENV_PREFIX}_{}_COLLECTION",
                kind.plural().to_ascii_uppercase()
            );
            if let Some(name) = lookup(&key).filter(|name| !name.is_empty()) {
                *config.collections.get_mut(kind) = name;
            }
        }

        config
    }
}
