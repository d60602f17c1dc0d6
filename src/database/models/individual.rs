use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::entity::{Audit, Entity};
use crate::database::patch::nullable;

use super::CreateUser;

value_set! {
    DocumentType {
        NationalId => "national_id",
        Passport => "passport",
        ForeignId => "foreign_id",
        TaxId => "tax_id",
    }
}

value_set! {
    /// Employment status. `Terminated` is terminal.
    IndividualStatus {
        Active => "active",
        OnLeave => "on_leave",
        Suspended => "suspended",
        Terminated => "terminated",
    }
}

impl IndividualStatus {
    pub fn can_transition_to(&self, next: IndividualStatus) -> bool {
        match self {
            IndividualStatus::Terminated => next == IndividualStatus::Terminated,
            IndividualStatus::Active | IndividualStatus::OnLeave | IndividualStatus::Suspended => true,
        }
    }
}

impl Default for IndividualStatus {
    fn default() -> Self {
        IndividualStatus::Active
    }
}

/// Person profile, optionally owned by a [`super::User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Individual {
    pub id: i64,
    pub user_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub document_type: DocumentType,
    pub document_number: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub termination_date: Option<NaiveDate>,
    pub country_id: Option<i64>,
    pub state_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: IndividualStatus,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl Individual {
    pub fn new(
        document_type: DocumentType,
        document_number: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            user_id: None,
            document_type,
            document_number: document_number.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
            address: None,
            birth_date: None,
            hire_date: None,
            termination_date: None,
            country_id: None,
            state_id: None,
            status: IndividualStatus::Active,
            audit: Audit::new(),
        }
    }
}

impl Entity for Individual {
    const NAME: &'static str = "Individual";
    const TABLE: &'static str = "individuals";
    const COLUMNS: &'static [&'static str] = &[
        "user_id",
        "document_type",
        "document_number",
        "first_name",
        "last_name",
        "phone",
        "address",
        "birth_date",
        "hire_date",
        "termination_date",
        "country_id",
        "state_id",
        "status",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["first_name", "last_name", "document_number"];

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
pub struct CreateIndividual {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub document_type: String,
    pub document_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub termination_date: Option<NaiveDate>,
    #[serde(default)]
    pub country_id: Option<i64>,
    #[serde(default)]
    pub state_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Owner and profile created together in one transaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIndividualWithUser {
    pub user: CreateUser,
    pub individual: CreateIndividual,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIndividual {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub termination_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub country_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub state_id: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
