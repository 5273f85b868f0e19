//! Application layer - HTTP API and command-line entry points

pub mod commands;
pub mod http;

pub use commands::{Cli, CommandExecutor, Commands};
pub use http::{router, AppState};
