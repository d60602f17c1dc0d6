use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{Audit, Entity};

/// First-level subdivision of a country. `code` is unique per country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct State {
    pub id: i64,
    pub country_id: i64,
    pub code: String,
    pub name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl State {
    pub fn new(country_id: i64, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            country_id,
            code: code.into(),
            name: name.into(),
            audit: Audit::new(),
        }
    }
}

impl Entity for State {
    const NAME: &'static str = "State";
    const TABLE: &'static str = "states";
    const COLUMNS: &'static [&'static str] = &["country_id", "code", "name"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["code", "name"];

    fn id(&self) -> i64 {
        self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateState {
    pub country_id: i64,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
