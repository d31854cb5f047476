//! End-to-end interactive rebase through the plan state machine

mod common;

use common::{current_branch, diverged_branches, git, head, path_string, setup_repo, subjects};
use mergepilot_lib::commands::{rebase, undo};
use mergepilot_lib::models::{ConflictFileResolution, RebaseAction, RebaseExecutionState};
use mergepilot_lib::services::create_session_state;
use mergepilot_lib::{EngineConfig, MergePilotError};

#[tokio::test]
async fn test_reorder_and_drop() {
    let (dir, _repo) = setup_repo();
    let main = diverged_branches(dir.path());
    let state = create_session_state(EngineConfig::default());
    let path = path_string(&dir);

    // Drop the conflicting commit so the rest replays cleanly
    let status = rebase::load_rebase_plan(&state, path.clone(), main.clone())
        .await
        .unwrap();
    let commits = status.plan.unwrap().commits;
    assert_eq!(commits.len(), 3);
    assert_eq!(commits[0].message, "Add a");

    rebase::set_rebase_action(&state, path.clone(), commits[1].hash.clone(), RebaseAction::Drop)
        .await
        .unwrap();
    rebase::move_rebase_commit(&state, path.clone(), 2, 0).await.unwrap();

    let status = rebase::start_rebase(&state, path.clone()).await.unwrap();
    assert_eq!(status.state, RebaseExecutionState::Completed);
    assert_eq!(
        subjects(dir.path(), 4),
        vec!["Add a", "Add b", "Edit shared on main", "Initial commit"]
    );
    assert_eq!(current_branch(dir.path()), "feature");
}

#[tokio::test]
async fn test_conflict_pause_resolve_continue() {
    let (dir, _repo) = setup_repo();
    let main = diverged_branches(dir.path());
    let state = create_session_state(EngineConfig::default());
    let path = path_string(&dir);

    rebase::load_rebase_plan(&state, path.clone(), main).await.unwrap();
    let status = rebase::start_rebase(&state, path.clone()).await.unwrap();
    assert_eq!(status.state, RebaseExecutionState::Conflicted);
    assert!(status.has_unresolved_conflicts);
    let progress = status.progress.unwrap();
    assert_eq!(progress.current, 2);
    assert_eq!(progress.total, 3);

    let conflict = status.conflict.unwrap();
    assert_eq!(conflict.current_commit.message, "Edit shared on feature");
    assert_eq!(conflict.files[0].path, "shared.txt");

    let err = rebase::continue_rebase(&state, path.clone()).await.unwrap_err();
    assert!(matches!(err, MergePilotError::OperationFailed(_)));

    let resolved = rebase::resolve_rebase_conflict_file(
        &state,
        path.clone(),
        "shared.txt".to_string(),
        ConflictFileResolution::Theirs,
    )
    .await
    .unwrap();
    assert!(resolved.success);

    let status = rebase::get_rebase_status(&state, path.clone()).await.unwrap();
    assert!(status.can_continue);
    assert!(!status.has_unresolved_conflicts);

    let status = rebase::continue_rebase(&state, path.clone()).await.unwrap();
    assert_eq!(status.state, RebaseExecutionState::Completed);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("shared.txt")).unwrap(),
        "feature change\n"
    );
    assert_eq!(
        subjects(dir.path(), 4),
        vec!["Add b", "Edit shared on feature", "Add a", "Edit shared on main"]
    );

    // A finished rebase can be planned again or cleared
    let status = rebase::load_rebase_plan(&state, path.clone(), "HEAD~1".to_string())
        .await
        .unwrap();
    assert_eq!(status.state, RebaseExecutionState::Planning);
    let status = rebase::clear_rebase_plan(&state, path).await.unwrap();
    assert_eq!(status.state, RebaseExecutionState::Idle);
}

#[tokio::test]
async fn test_abort_then_undo_history_kept() {
    let (dir, _repo) = setup_repo();
    let main = diverged_branches(dir.path());
    let before = head(dir.path());
    let state = create_session_state(EngineConfig::default());
    let path = path_string(&dir);

    rebase::load_rebase_plan(&state, path.clone(), main).await.unwrap();
    rebase::start_rebase(&state, path.clone()).await.unwrap();

    let status = rebase::abort_rebase(&state, path.clone()).await.unwrap();
    assert_eq!(status.state, RebaseExecutionState::Aborted);
    assert_eq!(head(dir.path()), before);
    assert!(!dir.path().join(".git").join("rebase-merge").exists());

    // Editing a finished plan is rejected until it is cleared
    let err = rebase::set_all_rebase_actions(&state, path.clone(), RebaseAction::Pick)
        .await
        .unwrap_err();
    assert_eq!(serde_json::to_value(&err).unwrap()["code"], "INVALID_REBASE_STATE");

    let history = undo::get_undo_state(&state, path).await.unwrap();
    assert_eq!(history.undo.len(), 1);
}

#[tokio::test]
async fn test_completed_rebase_undo_restores_head() {
    let (dir, _repo) = setup_repo();
    let main = diverged_branches(dir.path());
    assert!(git(dir.path(), &["checkout", "-q", &main]).status.success());
    assert!(git(dir.path(), &["checkout", "-q", "-b", "topic"]).status.success());
    common::commit_files(dir.path(), "Topic one", &[("t1.txt", "1\n")]);
    common::commit_files(dir.path(), "Topic two", &[("t2.txt", "2\n")]);
    let before = head(dir.path());

    let state = create_session_state(EngineConfig::default());
    let path = path_string(&dir);
    let status = rebase::load_rebase_plan(&state, path.clone(), main).await.unwrap();
    let first = status.plan.unwrap().commits[0].hash.clone();
    rebase::reword_rebase_commit(&state, path.clone(), first, "Topic one, reworded".to_string())
        .await
        .unwrap();

    let status = rebase::start_rebase(&state, path.clone()).await.unwrap();
    assert_eq!(status.state, RebaseExecutionState::Completed);
    assert_eq!(subjects(dir.path(), 2), vec!["Topic two", "Topic one, reworded"]);

    undo::undo(&state, path.clone()).await.unwrap();
    assert_eq!(head(dir.path()), before);

    let err = undo::redo(&state, path).await.unwrap_err();
    assert!(matches!(err, MergePilotError::Irreversible(_)));
}
