use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::auth::PermissionLevel;
use crate::database::entity::{Audit, Entity};

value_set! {
    /// Access role of a user. Lower rank means more privilege.
    Role {
        Admin => "admin",
        Manager => "manager",
        Collaborator => "collaborator",
        Reader => "reader",
        Guest => "guest",
    }
}

impl Role {
    pub fn rank(&self) -> u8 {
        match self {
            Role::Admin => 1,
            Role::Manager => 2,
            Role::Collaborator => 3,
            Role::Reader => 4,
            Role::Guest => 5,
        }
    }

    pub fn permission_level(&self) -> PermissionLevel {
        match self {
            Role::Admin => PermissionLevel::Delete,
            Role::Manager => PermissionLevel::Create,
            Role::Collaborator => PermissionLevel::Update,
            Role::Reader => PermissionLevel::Read,
            Role::Guest => PermissionLevel::None,
        }
    }

    /// True when `self` is at least as privileged as `other`.
    pub fn covers(&self, other: Role) -> bool {
        self.rank() <= other.rank()
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Reader
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

impl User {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: 0,
            email: email.into(),
            full_name: full_name.into(),
            role,
            audit: Audit::new(),
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "full_name", "role"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["email", "full_name"];

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
pub struct CreateUser {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
