pub mod cli;
pub mod load_config;
pub mod state;

pub use cli::{run, Cli, Commands};
