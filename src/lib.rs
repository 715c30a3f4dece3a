pub mod config;
pub mod error;
pub mod index;
pub mod listing;
pub mod matcher;
pub mod ops;
pub mod preset;
pub mod profile;

pub use error::{AmptError, AppResult};
pub use ops::{run, Command};
