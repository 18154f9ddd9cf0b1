pub mod directory;
pub mod principal;

pub use directory::{JobDirectoryStore, RemovalFailure, RemovalReport, StoreEntry};
pub use principal::Principal;
