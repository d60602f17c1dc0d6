pub mod entity;
pub mod manager;
pub mod models;
pub mod patch;
pub mod query_builder;
pub mod repositories;
pub mod repository;
pub mod seed;
pub mod unit_of_work;

pub use entity::{Audit, Entity};
pub use manager::{DatabaseError, DatabaseManager};
pub use patch::{Patch, PatchError};
pub use repository::{ListOptions, Page, Repository, RepositoryError};
pub use unit_of_work::UnitOfWork;
