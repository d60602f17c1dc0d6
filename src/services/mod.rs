pub mod country_service;
pub mod error;
pub mod individual_service;
pub mod state_service;
pub mod user_service;
pub mod validation;

pub use country_service::CountryService;
pub use error::{FieldErrors, ServiceError};
pub use individual_service::IndividualService;
pub use state_service::StateService;
pub use user_service::UserService;

use sqlx::SqlitePool;

/// One instance of every service, sharing a pool.
#[derive(Debug, Clone)]
pub struct Services {
    pub users: UserService,
    pub countries: CountryService,
    pub states: StateService,
    pub individuals: IndividualService,
}

impl Services {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserService::new(pool.clone()),
            countries: CountryService::new(pool.clone()),
            states: StateService::new(pool.clone()),
            individuals: IndividualService::new(pool),
        }
    }
}
