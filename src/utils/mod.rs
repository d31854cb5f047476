//! Utility helpers

pub mod command;

pub use command::{create_command, GitCli, GitOutput};
