pub mod cli;
pub mod load_config;
pub mod upload;

pub use cli::{run, run_with, Cli};
