use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{Audit, Entity};
use crate::database::patch::nullable;

/// ISO 3166-1 country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Country {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub phone_code: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Country {
    pub fn new(code: impl Into<String>, name: impl Into<String>, phone_code: Option<String>) -> Self {
        Self {
            id: 0,
            code: code.into(),
            name: name.into(),
            phone_code,
            audit: Audit::new(),
        }
    }
}

impl Entity for Country {
    const NAME: &'static str = "Country";
    const TABLE: &'static str = "countries";
    const COLUMNS: &'static [&'static str] = &["code", "name", "phone_code"];
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
pub struct CreateCountry {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub phone_code: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCountry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub phone_code: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
