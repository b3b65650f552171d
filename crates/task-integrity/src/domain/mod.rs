//! Domain facades.
//!
//! These facades load tag snapshots from storage, run the integrity engine,
//! and persist the result only when the engine succeeded and changed
//! something.

mod config;
mod deps;
mod moves;

pub use config::ConfigDomain;
pub use deps::DependencyDomain;
pub use moves::MoveDomain;
