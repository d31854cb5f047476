//! Undo-recording git operation handlers

use crate::commands::with_session;
use crate::error::Result;
use crate::services::operations::{self, MergeOutcome};
use crate::services::SessionState;

/// Merge `branch` into HEAD; conflicts come back in the outcome
pub async fn merge_branch(state: &SessionState, path: String, branch: String) -> Result<MergeOutcome> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        let applier = session.applier().clone();
        operations::merge_branch(&git, &applier, &mut session.ledger, &branch)
    })
    .await
}

pub async fn cherry_pick(state: &SessionState, path: String, commit: String) -> Result<MergeOutcome> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        let applier = session.applier().clone();
        operations::cherry_pick(&git, &applier, &mut session.ledger, &commit)
    })
    .await
}

pub async fn checkout_branch(state: &SessionState, path: String, branch: String) -> Result<()> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        operations::checkout_branch(&git, &mut session.ledger, &branch)
    })
    .await
}

pub async fn stash_save(state: &SessionState, path: String, message: Option<String>) -> Result<()> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        operations::stash_save(&git, &mut session.ledger, message.as_deref())
    })
    .await
}

/// Stage all changes and commit them; returns the new commit hash
pub async fn commit_all(state: &SessionState, path: String, message: String) -> Result<String> {
    with_session(state, &path, |session| {
        let git = session.git().clone();
        operations::commit_all(&git, &mut session.ledger, &message)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{conflict, undo};
    use crate::config::EngineConfig;
    use crate::models::ConflictResolution;
    use crate::services::create_session_state;
    use crate::test_utils::TestRepo;

    #[tokio::test]
    async fn test_merge_conflict_resolve_and_undo() {
        let repo = TestRepo::with_initial_commit();
        repo.create_commit("Add shared", &[("shared.txt", "original\n")]);
        let main = repo.current_branch();
        repo.create_branch("feature");
        repo.checkout_branch("feature");
        repo.create_commit("Feature edit", &[("shared.txt", "feature change\n")]);
        repo.checkout_branch(&main);
        repo.create_commit("Main edit", &[("shared.txt", "main change\n")]);
        let original_head = repo.head_oid();

        let state = create_session_state(EngineConfig::default());
        let outcome = merge_branch(&state, repo.path_str(), "feature".to_string())
            .await
            .unwrap();
        assert!(!outcome.success);
        let hunk_id = outcome.conflicts.unwrap().files[0].hunks[0].id.clone();

        conflict::resolve_hunk(
            &state,
            repo.path_str(),
            "shared.txt".to_string(),
            hunk_id,
            ConflictResolution::Theirs,
            None,
        )
        .await
        .unwrap();
        conflict::mark_file_resolved(&state, repo.path_str(), "shared.txt".to_string())
            .await
            .unwrap();
        assert!(conflict::continue_merge(&state, repo.path_str()).await.unwrap().success);
        assert_ne!(repo.head_oid(), original_head);

        undo::undo(&state, repo.path_str()).await.unwrap();
        assert_eq!(repo.head_oid(), original_head);
    }

    #[tokio::test]
    async fn test_stash_round_trip_through_undo() {
        let repo = TestRepo::with_initial_commit();
        let state = create_session_state(EngineConfig::default());
        repo.create_file("README.md", "edited");

        stash_save(&state, repo.path_str(), Some("wip".to_string()))
            .await
            .unwrap();
        undo::undo(&state, repo.path_str()).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(repo.path.join("README.md")).unwrap(),
            "edited"
        );
    }
}
