pub mod countries;
pub mod individuals;
pub mod states;
pub mod users;
