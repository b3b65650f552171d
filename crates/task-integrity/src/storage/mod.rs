//! Storage layer for tag persistence.

mod file;
mod traits;

pub use file::FileStorage;
pub use traits::Storage;
