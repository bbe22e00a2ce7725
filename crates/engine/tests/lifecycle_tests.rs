//! Listing, metadata updates and cascading deletes.

mod common;

use common::fixtures::make_jpeg;
use common::{default_orchestrator, orchestrator_with};
use larder_core::config::{ImageConfig, UploadLimits};
use larder_core::record::{ListFilter, RecordPatch};
use larder_engine::{EngineError, FilesAction, IncomingFile};
use larder_metadata::MetadataStore;
use serde_json::json;

#[tokio::test]
async fn test_list_originals_embeds_versions() {
    let config = ImageConfig {
        sizes: vec![100, 50],
        ..ImageConfig::default()
    };
    let (orchestrator, _) = orchestrator_with(UploadLimits::default(), Some(config)).await;
    let action = orchestrator.clone().action();

    action
        .store_original_file(IncomingFile::new(
            "photo.jpg",
            "image/jpeg",
            make_jpeg(120, 90),
        ))
        .await
        .unwrap();
    action
        .store_original_file(IncomingFile::new(
            "notes.txt",
            "text/plain",
            b"plain".to_vec(),
        ))
        .await
        .unwrap();

    let listed = action.list_originals(&ListFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 2);

    let photo = &listed[0];
    assert_eq!(photo.file_name, "photo.jpg");
    let names: Vec<&str> = photo.versions.iter().map(|v| v.version.as_str()).collect();
    assert_eq!(names, vec!["50", "100"]);
    for version in &photo.versions {
        assert!(version.href.is_some());
    }
    assert!(photo.href.is_some());

    let notes = &listed[1];
    assert!(notes.versions.is_empty());

    // Derivatives never appear as top-level items.
    assert!(listed.iter().all(|record| record.is_original()));
}

#[tokio::test]
async fn test_list_respects_filters() {
    let (orchestrator, _) = default_orchestrator().await;
    let action = orchestrator.clone().action();

    for name in ["a.txt", "b.txt"] {
        action
            .store_original_file(IncomingFile::new(name, "text/plain", b"x".to_vec()))
            .await
            .unwrap();
    }

    let filter = ListFilter {
        file_name: Some("b.txt".to_string()),
        ..ListFilter::default()
    };
    let listed = action.list_originals(&filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].file_name, "b.txt");
}

#[tokio::test]
async fn test_update_touches_metadata_only() {
    let (orchestrator, payload) = default_orchestrator().await;
    let action = orchestrator.clone().action();

    let record = action
        .store_original_file(IncomingFile::new(
            "report.txt",
            "text/plain",
            b"immutable payload".to_vec(),
        ))
        .await
        .unwrap();
    let key = format!("{}/{}/original", common::NAMESPACE, record.id);
    let before = payload.get_sync(&key);

    let patch = RecordPatch::from_json(&json!({
        "file_name": "renamed.txt",
        "description": "now with a description",
    }))
    .unwrap();
    let updated = action.update_metadata(record.id, &patch).await.unwrap();

    assert_eq!(updated.file_name, "renamed.txt");
    assert_eq!(
        updated.description.as_deref(),
        Some("now with a description")
    );
    assert_eq!(updated.md5, record.md5);

    // Same key, byte-identical payload.
    assert_eq!(payload.keys(), vec![key.clone()]);
    assert_eq!(payload.get_sync(&key), before);
}

#[tokio::test]
async fn test_update_unknown_id_is_not_found() {
    let (orchestrator, _) = default_orchestrator().await;
    let action = orchestrator.clone().action();

    let err = action
        .update_metadata(4242, &RecordPatch::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_original_removes_derivatives() {
    let config = ImageConfig {
        sizes: vec![100, 50],
        ..ImageConfig::default()
    };
    let (orchestrator, payload) = orchestrator_with(UploadLimits::default(), Some(config)).await;
    let action = orchestrator.clone().action();

    let record = action
        .store_original_file(IncomingFile::new(
            "photo.jpg",
            "image/jpeg",
            make_jpeg(120, 90),
        ))
        .await
        .unwrap();
    let derivative_ids: Vec<i64> = record.versions.iter().map(|v| v.id).collect();
    assert_eq!(payload.len(), 3);

    action.delete_file(record.id).await.unwrap();

    assert_eq!(payload.len(), 0);
    let metadata = orchestrator.metadata();
    assert!(metadata.get(record.id).await.unwrap().is_none());
    for id in derivative_ids {
        assert!(metadata.get(id).await.unwrap().is_none());
    }

    // Deleting the already-deleted id surfaces a clean NotFound outcome.
    let err = action.delete_file(record.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_derivative_alone() {
    let config = ImageConfig {
        sizes: vec![100, 50],
        ..ImageConfig::default()
    };
    let (orchestrator, payload) = orchestrator_with(UploadLimits::default(), Some(config)).await;
    let action = orchestrator.clone().action();

    let record = action
        .store_original_file(IncomingFile::new(
            "photo.jpg",
            "image/jpeg",
            make_jpeg(120, 90),
        ))
        .await
        .unwrap();
    let victim = record.versions[0].id;

    action.delete_file(victim).await.unwrap();

    let metadata = orchestrator.metadata();
    assert!(metadata.get(victim).await.unwrap().is_none());
    assert!(metadata.get(record.id).await.unwrap().is_some());
    assert_eq!(payload.len(), 2);

    let listed = action.list_originals(&ListFilter::default()).await.unwrap();
    assert_eq!(listed[0].versions.len(), 1);
}

#[tokio::test]
async fn test_delete_tolerates_missing_payload() {
    let (orchestrator, payload) = default_orchestrator().await;
    let action = orchestrator.clone().action();

    let record = action
        .store_original_file(IncomingFile::new(
            "a.txt",
            "text/plain",
            b"payload".to_vec(),
        ))
        .await
        .unwrap();

    // Simulate a partial prior failure: the payload is already gone.
    use larder_storage::PayloadStore;
    let key = format!("{}/{}/original", common::NAMESPACE, record.id);
    payload.delete(&key).await.unwrap();

    action.delete_file(record.id).await.unwrap();
    assert!(
        orchestrator
            .metadata()
            .get(record.id)
            .await
            .unwrap()
            .is_none()
    );
}
