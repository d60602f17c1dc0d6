use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::database::models::{Country, State};
use crate::database::repositories::{CountryRepository, StateRepository};
use crate::database::{RepositoryError, UnitOfWork};

const GEOGRAPHY: &str = include_str!("../../seed/geography.yaml");

#[derive(Debug, Deserialize)]
struct SeedFile {
    countries: Vec<SeedCountry>,
}

#[derive(Debug, Deserialize)]
struct SeedCountry {
    code: String,
    name: String,
    #[serde(default)]
    phone_code: Option<String>,
    #[serde(default)]
    states: Vec<SeedState>,
}

#[derive(Debug, Deserialize)]
struct SeedState {
    code: String,
    name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid seed document: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub countries_created: usize,
    pub states_created: usize,
    pub skipped: usize,
}

/// Loads the embedded reference geography.
///
/// Rows are matched by business key, soft-deleted ones included, so running
/// the loader again never duplicates or resurrects anything.
pub async fn seed_geography(pool: &SqlitePool) -> Result<SeedReport, SeedError> {
    let document: SeedFile = serde_yaml::from_str(GEOGRAPHY)?;
    let countries = CountryRepository::new();
    let states = StateRepository::new();
    let mut report = SeedReport::default();

    let mut uow = UnitOfWork::begin(pool, "seed").await?;
    for seed in document.countries {
        let country = match countries.get_by_code_any(uow.conn(), &seed.code).await? {
            Some(existing) => {
                report.skipped += 1;
                existing
            }
            None => {
                report.countries_created += 1;
                let record = Country::new(seed.code.to_uppercase(), seed.name, seed.phone_code);
                countries.create(uow.conn(), &record).await?
            }
        };

        for state in seed.states {
            if states.get_by_code_any(uow.conn(), country.id, &state.code).await?.is_some() {
                report.skipped += 1;
                continue;
            }
            let record = State::new(country.id, state.code.to_uppercase(), state.name);
            states.create(uow.conn(), &record).await?;
            report.states_created += 1;
        }
    }
    uow.flush().await?;
    uow.commit().await?;

    info!(
        countries = report.countries_created,
        states = report.states_created,
        skipped = report.skipped,
        "Seeded reference geography"
    );
    Ok(report)
}
