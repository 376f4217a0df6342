//! Trash lifecycle through the manager and the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use lilac::config::LifecycleConfig;
use lilac::models::{EntityKind, NewDocument};
use lilac::services::{LifecycleError, LifecycleManager};
use lilac::store::{DocumentStore, MemoryStore};

fn new_doc(name: &str) -> NewDocument {
    NewDocument {
        name: name.to_string(),
        original_filename: format!("{}.pdf", name),
        category: Some("Registrar Files".to_string()),
        category_confidence: 0.9,
        award_type: None,
        excerpt: None,
        mime_type: "application/pdf".to_string(),
        bytes: vec![1, 2, 3],
    }
}

#[tokio::test]
async fn test_delete_restore_purge_cycle() {
    let store = Arc::new(MemoryStore::new());
    let created = store.create_document(new_doc("Transcript")).await.unwrap();
    let original = store.documents()[0].clone();
    let lifecycle = LifecycleManager::new(store.clone(), &LifecycleConfig::default());

    lifecycle
        .delete(EntityKind::Document, &created.id)
        .await
        .unwrap();
    let trash = lifecycle.list_trash(EntityKind::Document).await.unwrap();
    assert_eq!(trash[0].original_id, created.id);

    lifecycle
        .restore(EntityKind::Document, &trash[0].trash_id)
        .await
        .unwrap();
    assert_eq!(store.documents(), vec![original]);

    lifecycle
        .delete(EntityKind::Document, &created.id)
        .await
        .unwrap();
    let trash_id = lifecycle.list_trash(EntityKind::Document).await.unwrap()[0]
        .trash_id
        .clone();
    lifecycle
        .purge(EntityKind::Document, &trash_id)
        .await
        .unwrap();

    assert!(lifecycle
        .restore(EntityKind::Document, &trash_id)
        .await
        .is_err());
    assert!(store.documents().is_empty());
    assert_eq!(store.get_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn test_timeout_is_reported_per_item() {
    let store = Arc::new(MemoryStore::new());
    let created = store.create_document(new_doc("Slow")).await.unwrap();
    store.set_latency(Duration::from_millis(500));

    let lifecycle = LifecycleManager::new(store.clone(), &LifecycleConfig::default())
        .with_timeout(Duration::from_millis(20));

    let err = lifecycle
        .delete(EntityKind::Document, &created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LifecycleError::TimedOut(_)));

    let outcome = lifecycle
        .bulk_delete(EntityKind::Document, &[created.id.clone()])
        .await;
    assert_eq!(outcome.failed(), 1);
    assert!(outcome.outcomes[0].message.contains("did not answer"));
}
