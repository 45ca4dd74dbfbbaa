mod common;

use std::sync::Arc;

use common::*;
use nearby_application::{BackgroundStatus, EnableOptions, ResumeOutcome};
use nearby_core::error::{NearbyError, PermissionDeniedReason};
use nearby_core::platform::{PermissionStatus, PermissionTier};
use nearby_core::sharing::{SharingContext, SharingState, SharingStateRepository};
use nearby_infrastructure::{JsonFileKeyValueStore, SharingStateRepositoryImpl};
use tempfile::TempDir;

fn repository(harness: &Harness) -> SharingStateRepositoryImpl {
    SharingStateRepositoryImpl::new(harness.key_value.clone())
}

#[tokio::test]
async fn test_enable_twice_yields_same_record() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    let services = &harness.services;

    let first = services
        .enable("viewer", profile("Vi", &["photo"]), EnableOptions::default())
        .await
        .unwrap();
    assert!(first.first_fix_published);
    assert!(!first.already_sharing);
    let record = harness.record("viewer").unwrap();

    let second = services
        .enable("viewer", profile("Vi", &["photo"]), EnableOptions::default())
        .await
        .unwrap();
    assert!(second.already_sharing);

    assert_eq!(harness.record("viewer").unwrap(), record);
    assert_eq!(harness.record_count().await, 1);
    assert_eq!(harness.locations.live_watchers(), 1);
    assert_eq!(services.state(), SharingState::Sharing);
}

#[tokio::test]
async fn test_enable_persists_preference_and_context() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));

    harness
        .services
        .enable("u1", profile("Ana", &["video"]), EnableOptions::default())
        .await
        .unwrap();

    let repo = repository(&harness);
    assert!(repo.get_preference().await);
    let context = repo.load_context().await.unwrap();
    assert_eq!(context.user_id, "u1");
    assert_eq!(context.profile, profile("Ana", &["video"]));
    assert!(!context.background);
    assert!(harness.services.get_sharing_preference().await);
}

#[tokio::test]
async fn test_watcher_ticks_are_published() {
    let harness = Harness::new(MockPermissions::granted(), None);
    harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await
        .unwrap();
    assert!(harness.record("u1").is_none());

    harness.locations.push(position(37.001, -122.0, 5)).await;
    assert!(
        wait_until(|| harness
            .record("u1")
            .is_some_and(|doc| doc["position"]["latitude"] == 37.001))
        .await
    );

    harness.locations.push(position(37.002, -122.0, 10)).await;
    assert!(
        wait_until(|| harness
            .record("u1")
            .is_some_and(|doc| doc["position"]["latitude"] == 37.002))
        .await
    );
}

#[tokio::test]
async fn test_disable_on_disabled_user_is_noop() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));

    let outcome = harness.services.disable("u1").await;

    assert!(!outcome.was_sharing);
    assert_eq!(harness.record_count().await, 0);
    assert_eq!(harness.services.state(), SharingState::Disabled);
    assert!(!harness.services.get_sharing_preference().await);
}

#[tokio::test]
async fn test_disable_stops_producers_and_removes_record() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::with_background())
        .await
        .unwrap();
    assert!(harness.scheduler.is_registered_now(TASK_ID));

    let outcome = harness.services.disable("u1").await;

    assert!(outcome.was_sharing);
    assert!(outcome.record_removed);
    assert!(harness.record("u1").is_none());
    assert_eq!(harness.locations.live_watchers(), 0);
    assert!(!harness.scheduler.is_registered_now(TASK_ID));
    assert!(repository(&harness).load_context().await.is_none());
    assert_eq!(harness.services.state(), SharingState::Disabled);

    // A late tick cannot resurrect the record
    harness.locations.push(position(37.001, -122.0, 5)).await;
    tokio::task::yield_now().await;
    assert!(harness.record("u1").is_none());
}

#[tokio::test]
async fn test_foreground_blocked_is_typed_error() {
    let harness = Harness::new(
        MockPermissions::new(PermissionStatus::Blocked, PermissionStatus::Undetermined),
        Some(position(37.0, -122.0, 0)),
    );

    let err = harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NearbyError::PermissionDenied {
            tier: PermissionTier::Foreground,
            reason: PermissionDeniedReason::Blocked
        }
    ));
    assert_eq!(harness.permissions.request_count(), 0);
    assert_eq!(harness.services.state(), SharingState::Disabled);
    assert_eq!(harness.record_count().await, 0);
    assert!(!harness.services.get_sharing_preference().await);
}

#[tokio::test]
async fn test_declined_prompt_leaves_sharing_disabled() {
    let permissions = MockPermissions::new(PermissionStatus::Undetermined, PermissionStatus::Undetermined);
    permissions.answer_with(PermissionTier::Foreground, PermissionStatus::Denied);
    let harness = Harness::new(permissions, Some(position(37.0, -122.0, 0)));

    let err = harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        NearbyError::PermissionDenied {
            reason: PermissionDeniedReason::Denied,
            ..
        }
    ));
    assert_eq!(harness.permissions.request_count(), 1);
    assert_eq!(harness.locations.live_watchers(), 0);
    assert_eq!(harness.services.state(), SharingState::Disabled);
}

#[tokio::test]
async fn test_background_denied_keeps_foreground_sharing() {
    let permissions = MockPermissions::new(PermissionStatus::Granted, PermissionStatus::Undetermined);
    permissions.answer_with(PermissionTier::Background, PermissionStatus::Denied);
    let harness = Harness::new(permissions, Some(position(37.0, -122.0, 0)));

    let outcome = harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::with_background())
        .await
        .unwrap();

    assert_eq!(
        outcome.background,
        BackgroundStatus::PermissionDenied(PermissionDeniedReason::Denied)
    );
    assert_eq!(harness.services.state(), SharingState::Sharing);
    assert!(!harness.scheduler.is_registered_now(TASK_ID));
    assert!(!harness.services.controller().is_background_active().await);
    assert!(!repository(&harness).load_context().await.unwrap().background);
}

#[tokio::test]
async fn test_store_failure_keeps_sharing() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    harness.documents.fail_writes(true);

    let outcome = harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await
        .unwrap();

    assert!(!outcome.first_fix_published);
    assert_eq!(harness.services.state(), SharingState::Sharing);
    assert!(harness.record("u1").is_none());

    // The next tick after the store comes back succeeds
    harness.documents.fail_writes(false);
    harness.locations.push(position(37.001, -122.0, 5)).await;
    assert!(wait_until(|| harness.record("u1").is_some()).await);
}

#[tokio::test]
async fn test_watcher_failure_rolls_back() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    harness.locations.fail_watch(true);

    let result = harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await;

    assert!(matches!(result, Err(NearbyError::Platform(_))));
    assert_eq!(harness.services.state(), SharingState::Disabled);
    assert!(harness.record("u1").is_none());
    assert!(!harness.services.get_sharing_preference().await);
    assert!(repository(&harness).load_context().await.is_none());
}

#[tokio::test]
async fn test_closed_stream_moves_to_error_then_disable_recovers() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    let mut states = harness.services.controller().watch_state();
    harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await
        .unwrap();

    harness.locations.close_all();
    states
        .wait_for(|state| *state == SharingState::Error)
        .await
        .unwrap();

    let outcome = harness.services.disable("u1").await;
    assert!(outcome.was_sharing);
    assert_eq!(harness.services.state(), SharingState::Disabled);
    assert!(harness.record("u1").is_none());
}

#[tokio::test]
async fn test_switching_users_disables_previous() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    let services = &harness.services;

    services
        .enable("u1", profile("Ana", &[]), EnableOptions::default())
        .await
        .unwrap();
    services
        .enable("u2", profile("Bo", &[]), EnableOptions::default())
        .await
        .unwrap();

    assert!(harness.record("u1").is_none());
    assert!(harness.record("u2").is_some());
    assert_eq!(services.controller().active_user().await.as_deref(), Some("u2"));
    assert_eq!(harness.locations.live_watchers(), 1);
}

#[tokio::test]
async fn test_resume_on_launch_never_prompts() {
    let harness = Harness::new(
        MockPermissions::new(PermissionStatus::Granted, PermissionStatus::Undetermined),
        Some(position(37.0, -122.0, 0)),
    );
    let repo = repository(&harness);
    repo.set_preference(true).await.unwrap();
    let context = SharingContext::new("u1", profile("Ana", &["video"])).with_background(true);
    repo.save_context(&context).await.unwrap();

    let outcome = harness.services.resume_on_launch().await;

    assert!(matches!(
        outcome,
        ResumeOutcome::MissingPermission(PermissionTier::Background)
    ));
    assert_eq!(harness.permissions.request_count(), 0);
    assert_eq!(harness.services.state(), SharingState::Disabled);
    assert!(harness.record("u1").is_none());
}

#[tokio::test]
async fn test_resume_on_launch_with_grants_resumes_from_context() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    let repo = repository(&harness);
    repo.set_preference(true).await.unwrap();
    let context = SharingContext::new("u1", profile("Ana", &["video"])).with_background(true);
    repo.save_context(&context).await.unwrap();

    let outcome = harness.services.resume_on_launch().await;

    match outcome {
        ResumeOutcome::Resumed(enabled) => {
            assert_eq!(enabled.user_id, "u1");
            assert!(enabled.background.is_active());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(harness.permissions.request_count(), 0);
    assert_eq!(harness.services.state(), SharingState::Sharing);
    let record = harness.record("u1").unwrap();
    assert_eq!(record["skills"][0], "video");
    assert!(harness.scheduler.is_registered_now(TASK_ID));
}

#[tokio::test]
async fn test_resume_on_launch_keeps_foreground_only_choice() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    let enabled = harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::foreground_only())
        .await
        .unwrap();
    assert_eq!(enabled.background, BackgroundStatus::NotRequested);
    harness.services.shutdown().await;

    let relaunched = harness.restart();
    let outcome = relaunched.services.resume_on_launch().await;

    match outcome {
        ResumeOutcome::Resumed(resumed) => {
            assert_eq!(resumed.user_id, "u1");
            assert_eq!(resumed.background, BackgroundStatus::NotRequested);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(!relaunched.scheduler.is_registered_now(TASK_ID));
    assert_eq!(relaunched.scheduler.registrations(), 0);
    assert_eq!(relaunched.services.state(), SharingState::Sharing);
}

#[tokio::test]
async fn test_resume_foreground_only_ignores_background_tier() {
    let harness = Harness::new(
        MockPermissions::new(PermissionStatus::Granted, PermissionStatus::Denied),
        Some(position(37.0, -122.0, 0)),
    );
    let repo = repository(&harness);
    repo.set_preference(true).await.unwrap();
    repo.save_context(&SharingContext::new("u1", profile("Ana", &[])))
        .await
        .unwrap();

    let outcome = harness.services.resume_on_launch().await;

    assert!(matches!(outcome, ResumeOutcome::Resumed(_)));
    assert_eq!(harness.permissions.request_count(), 0);
    assert!(!harness.scheduler.is_registered_now(TASK_ID));
}

#[tokio::test]
async fn test_resume_after_background_denied_is_foreground_only() {
    let permissions = MockPermissions::new(PermissionStatus::Granted, PermissionStatus::Undetermined);
    permissions.answer_with(PermissionTier::Background, PermissionStatus::Denied);
    let harness = Harness::new(permissions, Some(position(37.0, -122.0, 0)));
    harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::with_background())
        .await
        .unwrap();
    harness.services.shutdown().await;
    let prompts = harness.permissions.request_count();

    let relaunched = harness.restart();
    match relaunched.services.resume_on_launch().await {
        ResumeOutcome::Resumed(resumed) => {
            assert_eq!(resumed.background, BackgroundStatus::NotRequested)
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(relaunched.permissions.request_count(), prompts);
}

#[tokio::test]
async fn test_resume_on_launch_preference_off() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));

    assert!(matches!(
        harness.services.resume_on_launch().await,
        ResumeOutcome::PreferenceOff
    ));
    assert_eq!(harness.locations.live_watchers(), 0);
}

#[tokio::test]
async fn test_resume_on_launch_missing_context() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    repository(&harness).set_preference(true).await.unwrap();

    assert!(matches!(
        harness.services.resume_on_launch().await,
        ResumeOutcome::MissingContext
    ));
}

#[tokio::test]
async fn test_disable_after_restart_clears_stale_registration() {
    let harness = Harness::new(MockPermissions::granted(), Some(position(37.0, -122.0, 0)));
    harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::with_background())
        .await
        .unwrap();
    harness.services.shutdown().await;

    // The OS kept the registration; the new session knows nothing about it
    let relaunched = harness.restart();
    assert!(relaunched.scheduler.is_registered_now(TASK_ID));

    let outcome = relaunched.services.disable("u1").await;

    assert!(!outcome.was_sharing);
    assert!(!relaunched.scheduler.is_registered_now(TASK_ID));
    assert!(relaunched.record("u1").is_none());
}

#[tokio::test]
async fn test_preference_survives_restart_on_disk() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("sharing_state.json");

    let harness = Harness::with_key_value(
        MockPermissions::granted(),
        Some(position(37.0, -122.0, 0)),
        Arc::new(JsonFileKeyValueStore::with_path(path.clone())),
    );
    harness
        .services
        .enable("u1", profile("Ana", &[]), EnableOptions::with_background())
        .await?;
    harness.services.shutdown().await;
    assert!(path.exists());

    let relaunched = Harness::with_key_value(
        MockPermissions::granted(),
        Some(position(37.0, -122.0, 0)),
        Arc::new(JsonFileKeyValueStore::with_path(path)),
    );
    assert!(relaunched.services.get_sharing_preference().await);
    assert!(matches!(
        relaunched.services.resume_on_launch().await,
        ResumeOutcome::Resumed(_)
    ));
    Ok(())
}
