pub mod cli;
pub mod db;
pub mod fixtures;
pub mod import;
pub mod migrate;
pub mod refstore;
pub mod restore;
pub mod validate;

pub use cli::{Cli, Commands};
