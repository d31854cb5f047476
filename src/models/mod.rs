//! Data models for MergePilot

pub mod conflict;
pub mod rebase;
pub mod repository;
pub mod undo;

pub use conflict::*;
pub use rebase::*;
pub use repository::*;
pub use undo::*;
