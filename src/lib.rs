pub mod cli;
pub mod load_config;
pub mod postgres_source;

pub use cli::{run, Cli, Commands};
