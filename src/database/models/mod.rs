/// A string outside of a closed value set.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}; accepted values: {accepted}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
    pub accepted: String,
}

/// Declares a closed set of string values stored as TEXT.
macro_rules! value_set {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }

            pub fn accepted_values() -> String {
                Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::database::models::UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == normalized)
                    .ok_or_else(|| $crate::database::models::UnknownValue {
                        kind: stringify!($name),
                        value: s.to_string(),
                        accepted: Self::accepted_values(),
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::database::models::UnknownValue;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use value_set;

pub mod country;
pub mod individual;
pub mod state;
pub mod user;

pub use country::{Country, CreateCountry, UpdateCountry};
pub use individual::{
    CreateIndividual, CreateIndividualWithUser, DocumentType, Individual, IndividualStatus,
    UpdateIndividual,
};
pub use state::{CreateState, State, UpdateState};
pub use user::{CreateUser, Role, UpdateUser, User};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Manager ".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("ON_LEAVE".parse::<IndividualStatus>().unwrap(), IndividualStatus::OnLeave);
    }

    #[test]
    fn unknown_value_lists_accepted_values() {
        let err = "retired".parse::<IndividualStatus>().unwrap_err();
        assert_eq!(err.value, "retired");
        assert_eq!(err.accepted, "active, on_leave, suspended, terminated");
        assert!(err.to_string().contains("retired"));
    }

    #[test]
    fn serializes_as_stored_text() {
        assert_eq!(serde_json::to_value(DocumentType::NationalId).unwrap(), "national_id");
        assert_eq!(DocumentType::try_from("passport".to_string()).unwrap(), DocumentType::Passport);
    }
}
