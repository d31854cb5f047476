//! Command handlers
//!
//! One async function per protocol request. Each takes the repository
//! `path` plus its payload and returns a serialisable `Result`.

pub mod conflict;
pub mod operations;
pub mod rebase;
pub mod undo;

use crate::error::Result;
use crate::services::{RepositorySession, SessionState};

/// Run `f` while holding the repository's session lock for writing
pub(crate) async fn with_session<T>(
    state: &SessionState,
    path: &str,
    f: impl FnOnce(&mut RepositorySession) -> Result<T>,
) -> Result<T> {
    let session = state.session(path).await?;
    let mut session = session.write().await;
    f(&mut session)
}

/// Run a read-only `f`; shares the lock with other readers only
pub(crate) async fn with_session_read<T>(
    state: &SessionState,
    path: &str,
    f: impl FnOnce(&RepositorySession) -> Result<T>,
) -> Result<T> {
    let session = state.session(path).await?;
    let session = session.read().await;
    f(&session)
}
