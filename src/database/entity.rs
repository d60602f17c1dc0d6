use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow};

/// Columns owned by the repository. Patches may never name them.
pub const SYSTEM_FIELDS: &[&str] = &["id", "is_deleted", "created_at", "updated_at"];

/// Audit and soft-delete block carried by every entity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Audit {
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Audit {
    fn default() -> Self {
        Self::new()
    }
}

impl Audit {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamps `updated_at`, never earlier than `created_at`.
    pub fn touch(&mut self) -> DateTime<Utc> {
        self.updated_at = Utc::now().max(self.created_at);
        self.updated_at
    }
}

/// A row type managed by [`super::Repository`].
///
/// `COLUMNS` lists the writable business columns in insert order; `is_active`
/// is always writable in addition to them.
pub trait Entity:
    for<'r> FromRow<'r, SqliteRow>
    + Serialize
    + DeserializeOwned
    + Clone
    + Send
    + Sync
    + Unpin
    + 'static
{
    /// Human readable name used in errors, e.g. `"Country"`.
    const NAME: &'static str;
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const SEARCH_COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> i64;
    fn audit(&self) -> &Audit;
    fn audit_mut(&mut self) -> &mut Audit;

    fn is_writable(column: &str) -> bool {
        column == "is_active" || Self::COLUMNS.contains(&column)
    }

    /// Every column of the table, used to whitelist filter and order keys.
    fn known_columns() -> Vec<&'static str> {
        let mut columns = vec!["id"];
        columns.extend_from_slice(Self::COLUMNS);
        columns.extend_from_slice(&["is_active", "is_deleted", "created_at", "updated_at"]);
        columns
    }
}
