pub mod system;

pub use system::{health, root};
