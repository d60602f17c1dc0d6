// Public (no auth) → Protected (bearer JWT)
pub mod params;
pub mod protected;
pub mod public;
