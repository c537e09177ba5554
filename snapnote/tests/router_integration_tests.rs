//! End-to-end tests of the message protocol
//!
//! Every request goes through the router, the way a content script or the
//! popup would talk to the store:
//! - saving, listing, updating and deleting notes
//! - the note ceiling and quota eviction
//! - error mapping at the router boundary
//! - per-context sessions
//! - concurrent mutations from several contexts

use serde_json::{json, Value};
use snapnote::notes::Note;
use snapnote::quota::LOW_STORAGE_MESSAGE;
use snapnote::router::errors::{NOTE_NOT_FOUND, STORAGE_UNAVAILABLE};
use snapnote::storage::{FileSystemStorage, MemoryStorageConfig, StorageBackend};
use snapnote::test_utils::TestHarness;
use snapnote::{MessageRouter, Request, Response, Stats};
use std::collections::HashSet;
use std::sync::Arc;

async fn save(router: &MessageRouter, content: &str, url: &str) -> Response {
    router
        .dispatch(
            "content-script",
            Request::new("saveNote").with("data", json!({"content": content, "url": url})),
        )
        .await
}

async fn saved_note(router: &MessageRouter, content: &str, url: &str) -> Note {
    let mut response = save(router, content, url).await;
    assert!(response.success, "save failed: {:?}", response.error);
    response.take("note").unwrap()
}

async fn list(router: &MessageRouter, url: Option<&str>) -> Vec<Note> {
    let mut request = Request::new("getNotes");
    if let Some(url) = url {
        request = request.with("url", url);
    }
    let mut response = router.dispatch("popup", request).await;
    assert!(response.success);
    response.take("notes").unwrap()
}

async fn set_max_notes(router: &MessageRouter, max: usize) {
    let response = router
        .dispatch(
            "popup",
            Request::new("updateSettings").with("settings", json!({"maxNotes": max})),
        )
        .await;
    assert!(response.success);
}

#[tokio::test]
async fn test_save_then_list_same_domain_different_path() {
    let harness = TestHarness::new();
    let router = &harness.router;

    let note = saved_note(router, "hello", "https://a.com/x").await;
    assert_eq!(note.domain, "a.com");
    assert!(!note.id.as_str().is_empty());

    let notes = list(router, Some("https://a.com/y")).await;
    assert_eq!(notes, vec![note.clone()]);

    let all = list(router, None).await;
    assert_eq!(all.iter().filter(|n| n.id == note.id).count(), 1);
    assert_eq!(all[0].content, "hello");
    assert_eq!(all[0].url, "https://a.com/x");
}

#[tokio::test]
async fn test_content_script_payload_shape() {
    let harness = TestHarness::new();
    let mut response = harness
        .router
        .dispatch_value(
            "tab-7",
            json!({
                "action": "saveNote",
                "noteData": {
                    "content": "<b>bold</b> claim",
                    "url": "https://news.example.com/story",
                    "title": "Story",
                    "timestamp": 1_700_000_000_000i64,
                    "type": "text",
                    "id": "client-chosen",
                    "domain": "evil.com"
                }
            }),
        )
        .await;

    assert!(response.success);
    let note: Note = response.take("note").unwrap();
    assert_eq!(note.content, "&lt;b&gt;bold&lt;/b&gt; claim");
    assert_eq!(note.domain, "news.example.com");
    assert_ne!(note.id.as_str(), "client-chosen");
    assert_eq!(note.timestamp.timestamp_millis(), 1_700_000_000_000);
}

#[tokio::test]
async fn test_validation_failures_surface_verbatim() {
    let harness = TestHarness::new();
    let router = &harness.router;

    let cases = [
        (json!({"content": "  ", "url": "https://a.com"}), "Note content cannot be empty"),
        (
            json!({"content": "x".repeat(10_001), "url": "https://a.com"}),
            "Note content is too long (max 10,000 characters)",
        ),
        (json!({"content": "x", "url": "not a url"}), "Invalid URL provided"),
        (
            json!({"content": "x", "url": "https://a.com", "type": "video"}),
            "Invalid note type",
        ),
    ];
    for (data, message) in cases {
        let response = router
            .dispatch("tab", Request::new("saveNote").with("data", data))
            .await;
        assert_eq!(response, Response::failure(message));
    }

    assert!(list(router, None).await.is_empty());
    assert!(harness.backend.get("notes").await.unwrap().is_none());
}

#[tokio::test]
async fn test_content_length_counts_characters() {
    let harness = TestHarness::new();
    let response = save(&harness.router, &"é".repeat(10_000), "https://a.com").await;
    assert!(response.success);
}

#[tokio::test]
async fn test_max_notes_scenario() {
    let harness = TestHarness::new();
    let router = &harness.router;
    set_max_notes(router, 3).await;

    saved_note(router, "1", "https://a.com").await;
    saved_note(router, "2", "https://a.com").await;
    assert_eq!(list(router, None).await.len(), 2);

    saved_note(router, "3", "https://a.com").await;
    assert_eq!(list(router, None).await.len(), 3);

    let response = save(router, "4", "https://a.com").await;
    assert_eq!(
        response.error.as_deref(),
        Some("Maximum number of notes reached (3)")
    );
    assert_eq!(list(router, None).await.len(), 3);
}

#[tokio::test]
async fn test_delete_and_unknown_id() {
    let harness = TestHarness::new();
    let router = &harness.router;
    let keep = saved_note(router, "keep", "https://a.com").await;
    let gone = saved_note(router, "gone", "https://a.com").await;

    let mut response = router
        .dispatch("popup", Request::new("deleteNote").with("noteId", gone.id.as_str()))
        .await;
    assert!(response.success);
    assert_eq!(response.take::<Note>("note").unwrap().id, gone.id);
    assert!(list(router, None).await.iter().all(|n| n.id != gone.id));

    let before = list(router, None).await;
    let response = router
        .dispatch("popup", Request::new("deleteNote").with("noteId", "no-such-id"))
        .await;
    assert_eq!(response, Response::failure(NOTE_NOT_FOUND));
    assert_eq!(list(router, None).await, before);
    assert_eq!(before, vec![keep]);

    let response = router.dispatch("popup", Request::new("deleteNote")).await;
    assert_eq!(response.error.as_deref(), Some("Note ID is required"));
}

#[tokio::test]
async fn test_update_round_trip_and_failed_update() {
    let harness = TestHarness::new();
    let router = &harness.router;
    let note = saved_note(router, "old text", "https://a.com").await;

    let response = router
        .dispatch(
            "popup",
            Request::new("updateNote")
                .with("noteId", note.id.as_str())
                .with("content", ""),
        )
        .await;
    assert_eq!(response, Response::failure("Note content cannot be empty"));
    assert_eq!(list(router, None).await, vec![note.clone()]);

    let response = router
        .dispatch(
            "popup",
            Request::new("updateNote")
                .with("noteId", note.id.as_str())
                .with("content", "new text"),
        )
        .await;
    assert!(response.success);

    let stored = list(router, None).await.remove(0);
    assert_eq!(stored.content, "new text");
    assert!(stored.last_modified.unwrap() >= stored.timestamp);
    assert_eq!(stored.timestamp, note.timestamp);
}

#[tokio::test]
async fn test_domain_filters_partition_the_collection() {
    let harness = TestHarness::new();
    let router = &harness.router;
    for (content, url) in [
        ("a1", "https://a.com/1"),
        ("b1", "https://b.com/1"),
        ("a2", "https://a.com/2"),
        ("c1", "http://c.org:8080/x"),
    ] {
        saved_note(router, content, url).await;
    }

    let mut response = router.dispatch("popup", Request::new("getDomains")).await;
    let domains: Vec<Value> = response.take("domains").unwrap();
    assert_eq!(domains[0], json!({"domain": "c.org", "count": 1}));

    let all: HashSet<String> = list(router, None)
        .await
        .into_iter()
        .map(|n| n.id.to_string())
        .collect();
    let mut union = HashSet::new();
    for summary in &domains {
        let domain = summary["domain"].as_str().unwrap();
        let subset = list(router, Some(&format!("https://{domain}/anything"))).await;
        assert!(subset.iter().all(|n| n.domain == domain));
        assert_eq!(subset.len() as u64, summary["count"].as_u64().unwrap());
        union.extend(subset.into_iter().map(|n| n.id.to_string()));
    }
    assert_eq!(union, all);
}

#[tokio::test]
async fn test_search_notes() {
    let harness = TestHarness::new();
    let router = &harness.router;
    saved_note(router, "Ownership rules", "https://doc.rust-lang.org/book").await;
    saved_note(router, "Unrelated", "https://example.com").await;

    let mut response = router
        .dispatch("popup", Request::new("searchNotes").with("query", "OWNERSHIP"))
        .await;
    let notes: Vec<Note> = response.take("notes").unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].domain, "doc.rust-lang.org");
}

#[tokio::test]
async fn test_stats_follow_mutations() {
    let harness = TestHarness::new();
    let router = &harness.router;

    let mut response = router.dispatch("popup", Request::new("getStats")).await;
    let stats: Value = response.take("stats").unwrap();
    assert_eq!(stats["notesAdded"], 0);
    assert!(stats["lastUpdated"].is_null());

    let note = saved_note(router, "x", "https://a.com").await;
    let image = Request::new("saveNote").with(
        "data",
        json!({
            "content": "a cat",
            "url": "https://a.com",
            "type": "image",
            "imageData": "data:image/png;base64,AA"
        }),
    );
    assert!(router.dispatch("tab", image).await.success);
    router
        .dispatch("popup", Request::new("deleteNote").with("noteId", note.id.as_str()))
        .await;

    let mut response = router.dispatch("popup", Request::new("getStats")).await;
    let stats: Stats = response.take("stats").unwrap();
    assert_eq!(stats.notes_added, 2);
    assert_eq!(stats.notes_deleted, 1);
    assert_eq!(stats.text_notes, 0);
    assert_eq!(stats.image_notes, 1);
    assert!(stats.last_updated.is_some());
}

#[tokio::test]
async fn test_stats_failure_does_not_fail_save() {
    let harness = TestHarness::with_config(MemoryStorageConfig {
        fail_set_key: Some("stats".to_string()),
        ..Default::default()
    });
    let response = save(&harness.router, "x", "https://a.com").await;
    assert!(response.success);
    assert_eq!(list(&harness.router, None).await.len(), 1);
}

#[tokio::test]
async fn test_storage_failure_is_generic() {
    let harness = TestHarness::new();
    saved_note(&harness.router, "x", "https://a.com").await;
    harness.backend.update_config(|c| c.fail_get = true).await;

    let response = harness.router.dispatch("popup", Request::new("getNotes")).await;
    assert_eq!(response, Response::failure(STORAGE_UNAVAILABLE));
}

#[tokio::test]
async fn test_quota_eviction_warns_user() {
    let harness = TestHarness::new();
    let router = &harness.router;
    let mut notifications = harness.notifier.subscribe();

    let mut saved = Vec::new();
    for i in 0..19 {
        saved.push(saved_note(router, &format!("n{i}"), "https://a.com").await);
    }
    harness
        .backend
        .update_config(|c| c.bytes_in_use_override = Some(10_000_000))
        .await;
    saved_note(router, "n19", "https://a.com").await;

    let notes = list(router, None).await;
    assert_eq!(notes.len(), 18);
    assert!(notes.iter().all(|n| n.id != saved[0].id && n.id != saved[1].id));

    let warning = notifications.recv().await.unwrap();
    assert_eq!(warning.message, LOW_STORAGE_MESSAGE);
}

#[tokio::test]
async fn test_check_quota_reports_usage() {
    let harness = TestHarness::new();
    let router = &harness.router;
    saved_note(router, "kept", "https://a.com").await;
    harness
        .backend
        .update_config(|c| c.bytes_in_use_override = Some(5_242_880))
        .await;

    let response = router.dispatch("popup", Request::new("checkQuota")).await;
    assert!(response.success);
    assert_eq!(response.data["usageRatio"], json!(0.5));
    assert_eq!(response.data["quota"]["cleaned"], json!(false));
    assert_eq!(response.data["quota"]["evictedCount"], json!(0));
    assert_eq!(list(router, None).await.len(), 1);
}

#[tokio::test]
async fn test_show_notification_and_disabled_notifications() {
    let harness = TestHarness::new();
    let router = &harness.router;
    let mut notifications = harness.notifier.subscribe();

    let response = router
        .dispatch(
            "tab",
            Request::new("showNotification")
                .with("message", "Note saved")
                .with("type", "success"),
        )
        .await;
    assert_eq!(response, Response::ok());
    assert_eq!(notifications.recv().await.unwrap().message, "Note saved");

    router
        .dispatch(
            "popup",
            Request::new("updateSettings").with("settings", json!({"notifications": false})),
        )
        .await;
    let response = router
        .dispatch("tab", Request::new("showNotification").with("message", "hidden"))
        .await;
    assert!(response.success);
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_settings_round_trip() {
    let harness = TestHarness::new();
    let router = &harness.router;

    let mut response = router.dispatch("popup", Request::new("getSettings")).await;
    let settings: Value = response.take("settings").unwrap();
    assert_eq!(
        settings,
        json!({"darkMode": false, "autoBackup": true, "maxNotes": 10000, "notifications": true})
    );

    let mut response = router
        .dispatch(
            "popup",
            Request::new("updateSettings").with("settings", json!({"isDarkMode": true})),
        )
        .await;
    let settings: Value = response.take("settings").unwrap();
    assert_eq!(settings["darkMode"], true);
    assert_eq!(settings["maxNotes"], 10000);
}

#[tokio::test]
async fn test_export() {
    let harness = TestHarness::new();
    let router = &harness.router;
    saved_note(router, "x", "https://a.com").await;

    let mut response = router.dispatch("popup", Request::new("exportNotes")).await;
    let filename: String = response.take("filename").unwrap();
    assert!(filename.starts_with("web-highlighter-notes-"));
    assert!(filename.ends_with(".json"));
    let data: Value = response.take("data").unwrap();
    assert_eq!(data["count"], 1);

    let response = router
        .dispatch("popup", Request::new("exportNotes").with("format", "csv"))
        .await;
    assert_eq!(
        response.error.as_deref(),
        Some("Unsupported export format: csv")
    );
}

#[tokio::test]
async fn test_sessions_are_per_context() {
    let harness = TestHarness::new();
    let router = &harness.router;

    router.dispatch("tab-1", Request::new("toggleHighlightMode")).await;
    router
        .dispatch("tab-2", Request::new("toggleImageMode").with("isActive", true))
        .await;

    let status = router.dispatch("tab-1", Request::new("getStatus")).await;
    assert_eq!(status.get("isHighlightActive"), Some(&json!(true)));
    assert_eq!(status.get("isImageModeActive"), Some(&json!(false)));

    let status = router.dispatch("tab-2", Request::new("getStatus")).await;
    assert_eq!(status.get("isHighlightActive"), Some(&json!(false)));
    assert_eq!(status.get("isImageModeActive"), Some(&json!(true)));

    router.dispatch("tab-2", Request::new("toggleHighlightMode")).await;
    let status = router.dispatch("tab-2", Request::new("getStatus")).await;
    assert_eq!(status.get("isHighlightActive"), Some(&json!(true)));
    assert_eq!(status.get("isImageModeActive"), Some(&json!(false)));
}

#[tokio::test]
async fn test_concurrent_contexts_through_served_router() {
    let harness = TestHarness::with_config(MemoryStorageConfig {
        operation_delay_ms: Some(1),
        ..Default::default()
    });
    let existing = saved_note(&harness.router, "to delete", "https://a.com").await;
    let (client, handle) = harness.router.clone().spawn(64);

    let mut pending = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        pending.push(tokio::spawn(async move {
            client
                .request(
                    format!("tab-{i}"),
                    Request::new("saveNote").with(
                        "data",
                        json!({"content": format!("note {i}"), "url": "https://a.com"}),
                    ),
                )
                .await
        }));
    }
    let delete = {
        let client = client.clone();
        let id = existing.id.to_string();
        tokio::spawn(async move {
            client
                .request("popup", Request::new("deleteNote").with("noteId", id))
                .await
        })
    };

    for task in pending {
        assert!(task.await.unwrap().unwrap().success);
    }
    assert!(delete.await.unwrap().unwrap().success);

    drop(client);
    handle.await.unwrap();

    let notes = list(&harness.router, None).await;
    assert_eq!(notes.len(), 10);
    assert!(notes.iter().all(|n| n.id != existing.id));
    let ids: HashSet<_> = notes.iter().map(|n| n.id.clone()).collect();
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_filesystem_backend_persists_across_routers() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn StorageBackend> =
        Arc::new(FileSystemStorage::new(dir.path(), 10_485_760));

    backend
        .set("notes_a.com", json!([{"stale": true}]))
        .await
        .unwrap();

    let config = snapnote::StoreConfig {
        data_dir: dir.path().to_path_buf(),
        ..snapnote::StoreConfig::default()
    };
    let store = snapnote::NoteStore::open(&config, Arc::new(snapnote::LogNotifier))
        .await
        .unwrap();
    let router = MessageRouter::new(Arc::new(store));
    let note = saved_note(&router, "persisted", "https://a.com").await;
    drop(router);

    assert!(!dir.path().join("notes_a.com.json").exists());

    let reopened = snapnote::NoteStore::open(&config, Arc::new(snapnote::LogNotifier))
        .await
        .unwrap();
    assert_eq!(reopened.list(None).await.unwrap(), vec![note]);
    assert!(reopened.settings().get().await.unwrap().auto_backup);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_stores_on_one_directory_keep_every_note() {
    let dir = tempfile::tempdir().unwrap();
    let config = snapnote::StoreConfig {
        data_dir: dir.path().to_path_buf(),
        ..snapnote::StoreConfig::default()
    };
    let first = Arc::new(
        snapnote::NoteStore::open(&config, Arc::new(snapnote::LogNotifier))
            .await
            .unwrap(),
    );
    let second = Arc::new(
        snapnote::NoteStore::open(&config, Arc::new(snapnote::LogNotifier))
            .await
            .unwrap(),
    );

    let creates = (0..20).map(|i| {
        let store = if i % 2 == 0 { first.clone() } else { second.clone() };
        tokio::spawn(async move {
            store
                .create(snapnote::NoteDraft::text(format!("note {i}"), "https://a.com"))
                .await
        })
    });
    let mut created = HashSet::new();
    for result in futures::future::join_all(creates).await {
        created.insert(result.unwrap().unwrap().id);
    }

    let stored: HashSet<_> = first
        .list(None)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(stored.len(), 20);
    assert_eq!(stored, created);
    assert_eq!(second.get_stats().await.unwrap().notes_added, 20);
}
