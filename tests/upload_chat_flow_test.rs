//! Upload and chat flows through the service layer

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{
    body, broken_body, FailingLoader, FixedLoader, GatedLoader, Harness, ScriptedBuilder,
    ScriptedModel,
};
use rag_pipeline::domain::models::ReadinessState;
use rag_pipeline::domain::ServiceError;

#[tokio::test]
async fn test_requests_rejected_until_model_ready() {
    let loader = GatedLoader::new();
    let harness = Harness::new(loader.clone(), Arc::new(ScriptedBuilder::default()));

    let err = harness.chat.handle_chat("alice", "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::ServiceNotReady));

    let load = harness.models.spawn_load();
    let err = harness
        .upload
        .handle_upload("alice", "notes.txt", body(&["hello"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ServiceNotReady));
    // Nothing was written while not ready
    assert!(harness.store.list_for_user("alice").await.unwrap().is_empty());

    loader.release();
    load.await.unwrap().unwrap();
    assert_eq!(harness.models.state(), ReadinessState::Ready);

    harness
        .upload
        .handle_upload("alice", "notes.txt", body(&["hello"]))
        .await
        .unwrap();
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_model_load_keeps_rejecting() {
    let harness = Harness::new(Arc::new(FailingLoader), Arc::new(ScriptedBuilder::default()));

    let err = harness.models.load().await.unwrap_err();
    assert!(matches!(err, ServiceError::ModelLoad(_)));
    assert_eq!(harness.models.state(), ReadinessState::Failed);

    let err = harness.chat.handle_chat("alice", "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::ServiceNotReady));
}

#[tokio::test]
async fn test_chat_preconditions_checked_in_order() {
    let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;

    let err = harness.chat.handle_chat("bad_user", "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidUserId(_)));

    let err = harness.chat.handle_chat("alice", "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::NoDocumentForUser));

    // A document on disk without a pipeline (e.g. after a restart)
    std::fs::create_dir_all(harness.upload_dir()).unwrap();
    std::fs::write(harness.upload_dir().join("alice_old.txt"), "old").unwrap();
    let err = harness.chat.handle_chat("alice", "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::PipelineNotReady));
}

#[tokio::test]
async fn test_upload_then_chat_answers_from_document() {
    let harness = Harness::extractive().ready().await;

    let stored = harness
        .upload
        .handle_upload(
            "alice",
            "facts.txt",
            body(&["The lighthouse keeper feeds ", "the gulls every morning."]),
        )
        .await
        .unwrap();
    assert_eq!(stored.path, harness.upload_dir().join("alice_facts.txt"));

    let answer = harness
        .chat
        .handle_chat("alice", "Who feeds the gulls?")
        .await
        .unwrap();
    assert_eq!(answer, "The lighthouse keeper feeds the gulls every morning.");
}

#[tokio::test]
async fn test_users_are_isolated() {
    let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;

    harness
        .upload
        .handle_upload("alice", "a.txt", body(&["alice data"]))
        .await
        .unwrap();

    let err = harness.chat.handle_chat("bob", "hi").await.unwrap_err();
    assert!(matches!(err, ServiceError::NoDocumentForUser));

    harness
        .upload
        .handle_upload("bob", "b.txt", body(&["bob data"]))
        .await
        .unwrap();

    assert_eq!(
        harness.chat.handle_chat("alice", "which?").await.unwrap(),
        "alice_a.txt"
    );
    assert_eq!(
        harness.chat.handle_chat("bob", "which?").await.unwrap(),
        "bob_b.txt"
    );
}

#[tokio::test]
async fn test_latest_upload_wins() {
    let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;

    harness
        .upload
        .handle_upload("alice", "first.txt", body(&["one"]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    harness
        .upload
        .handle_upload("alice", "second.txt", body(&["two"]))
        .await
        .unwrap();

    assert_eq!(
        harness.chat.handle_chat("alice", "q").await.unwrap(),
        "alice_second.txt"
    );
    let latest = harness.store.latest_for_user("alice").await.unwrap().unwrap();
    assert_eq!(latest.stored_name, "alice_second.txt");
}

#[tokio::test]
async fn test_reupload_same_name_replaces_content() {
    let harness = Harness::extractive().ready().await;

    harness
        .upload
        .handle_upload("alice", "doc.txt", body(&["Version one of the memo."]))
        .await
        .unwrap();
    harness
        .upload
        .handle_upload("alice", "doc.txt", body(&["Version two of the memo."]))
        .await
        .unwrap();

    let documents = harness.store.list_for_user("alice").await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(
        harness.chat.handle_chat("alice", "Which version?").await.unwrap(),
        "Version two of the memo."
    );
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_pipeline() {
    let harness = Harness::scripted(ScriptedBuilder {
        fail_on: Some("broken".to_string()),
        ..ScriptedBuilder::default()
    })
    .ready()
    .await;

    harness
        .upload
        .handle_upload("alice", "good.txt", body(&["fine"]))
        .await
        .unwrap();

    let err = harness
        .upload
        .handle_upload("alice", "broken.txt", body(&["bad"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IndexBuild(_)));

    // The failed document stays on disk but the old pipeline keeps serving
    let latest = harness.store.latest_for_user("alice").await.unwrap().unwrap();
    assert_eq!(latest.stored_name, "alice_broken.txt");
    assert_eq!(
        harness.chat.handle_chat("alice", "q").await.unwrap(),
        "alice_good.txt"
    );
}

#[tokio::test]
async fn test_slow_older_build_does_not_clobber_newer() {
    let harness = Harness::scripted(ScriptedBuilder {
        slow_on: Some(("slow".to_string(), Duration::from_millis(300))),
        ..ScriptedBuilder::default()
    })
    .ready()
    .await;

    let upload = Arc::clone(&harness.upload);
    let slow = tokio::spawn(async move {
        upload
            .handle_upload("alice", "slow.txt", body(&["older"]))
            .await
    });

    // Let the slow upload get past persisting before the fast one starts
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness
        .upload
        .handle_upload("alice", "fast.txt", body(&["newer"]))
        .await
        .unwrap();

    slow.await.unwrap().unwrap();
    assert_eq!(
        harness.chat.handle_chat("alice", "q").await.unwrap(),
        "alice_fast.txt"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_user_uploads_leave_one_consistent_pipeline() {
    for _ in 0..10 {
        let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let upload = Arc::clone(&harness.upload);
            handles.push(tokio::spawn(async move {
                let name = format!("doc{i}.txt");
                upload.handle_upload("alice", &name, body(&["content"])).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(harness.registry.len().await, 1);
        assert_eq!(harness.store.list_for_user("alice").await.unwrap().len(), 8);

        let latest = harness.store.latest_for_user("alice").await.unwrap().unwrap();
        let answer = harness.chat.handle_chat("alice", "q").await.unwrap();
        assert_eq!(answer, latest.stored_name);
    }
}

#[tokio::test]
async fn test_invalid_uploads_write_nothing() {
    let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;

    let err = harness
        .upload
        .handle_upload("../etc", "x.txt", body(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidUserId(_)));

    let stored = harness
        .upload
        .handle_upload("alice", "../../passwd.txt", body(&["x"]))
        .await
        .unwrap();
    // Traversal components are flattened into the stored name
    assert_eq!(stored.path.parent(), Some(harness.upload_dir().as_path()));
    assert_eq!(stored.stored_name, "alice_passwd.txt");

    let err = harness
        .upload
        .handle_upload("alice", "payload.exe", body(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnsupportedFileType(_)));
}

#[tokio::test]
async fn test_oversized_and_interrupted_uploads_leave_no_files() {
    let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;
    let big = "x".repeat(70 * 1024);

    let err = harness
        .upload
        .handle_upload("alice", "big.txt", body(&[big.as_str()]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::UploadTooLarge { .. }));

    let err = harness
        .upload
        .handle_upload("alice", "cut.txt", broken_body(&["partial"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Upload(_)));

    let leftovers: Vec<_> = std::fs::read_dir(harness.upload_dir())
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert!(leftovers.is_empty());
    assert!(!harness.registry.contains("alice").await);
}

#[tokio::test]
async fn test_generation_failure_is_opaque() {
    let model = Arc::new(ScriptedModel {
        answer: String::new(),
        fail: true,
    });
    let harness = Harness::new(
        Arc::new(FixedLoader(model)),
        Arc::new(ScriptedBuilder {
            use_model: true,
            ..ScriptedBuilder::default()
        }),
    )
    .ready()
    .await;

    harness
        .upload
        .handle_upload("alice", "a.txt", body(&["data"]))
        .await
        .unwrap();

    let err = harness.chat.handle_chat("alice", "q").await.unwrap_err();
    assert!(matches!(err, ServiceError::Generation(_)));
    assert_eq!(err.to_string(), "Failed to process request");
}

#[tokio::test]
async fn test_metrics_track_outcomes() {
    let harness = Harness::scripted(ScriptedBuilder::default()).ready().await;

    let _ = harness.chat.handle_chat("alice", "q").await;
    harness
        .upload
        .handle_upload("alice", "a.txt", body(&["data"]))
        .await
        .unwrap();
    harness.chat.handle_chat("alice", "q").await.unwrap();

    assert_eq!(harness.metrics.chat_requests_total.get(), 2);
    assert_eq!(
        harness
            .metrics
            .uploads_total
            .with_label_values(&["success"])
            .get(),
        1
    );
    assert_eq!(harness.metrics.pipelines_active.get(), 1);
    assert_eq!(harness.metrics.model_ready.get(), 1);
}
