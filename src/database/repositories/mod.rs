//! Entity repositories. Each wraps [`crate::database::Repository`] and adds
//! read-only queries that go through its soft-delete aware filter.

macro_rules! deref_repository {
    ($name:ident, $entity:ty) => {
        impl std::ops::Deref for $name {
            type Target = $crate::database::Repository<$entity>;

            fn deref(&self) -> &Self::Target {
                &self.base
            }
        }
    };
}

pub mod countries;
pub mod individuals;
pub mod states;
pub mod users;

pub use countries::CountryRepository;
pub use individuals::IndividualRepository;
pub use states::StateRepository;
pub use users::UserRepository;
