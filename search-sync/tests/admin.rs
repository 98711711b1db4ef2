//! Integration tests for index administration.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use search_sync::{
    IndexAdministrator, IndexManager, Indexable, Predicate, Scope, SearchSyncError,
};
use search_sync_shared::IndexDescriptor;

use common::{numbered_posts, post_indexable, Fixture, Post, DOC_TYPE, INDEX};

fn administrator(fixture: &Fixture, indexable: Indexable<Post>) -> IndexAdministrator<Post> {
    IndexAdministrator::new(
        Arc::new(indexable),
        fixture.engine.clone(),
        fixture.store.clone(),
    )
}

fn mapping() -> serde_json::Value {
    json!({ "properties": { "title": { "type": "text" } } })
}

#[tokio::test]
async fn test_create_index_twice_succeeds() {
    let fixture = Fixture::new(vec![]);
    let descriptor = IndexDescriptor::new(INDEX, DOC_TYPE)
        .with_settings(json!({ "number_of_shards": 3 }))
        .with_mapping(mapping());
    let admin = administrator(
        &fixture,
        Indexable::builder(descriptor)
            .projector(search_sync::DocumentProjector::serialized())
            .build()
            .unwrap(),
    );

    admin.create_index().await.unwrap();
    admin.create_index().await.unwrap();

    assert!(fixture.engine.has_index(INDEX));
    assert_eq!(
        fixture.engine.index_body(INDEX),
        Some(json!({ "settings": { "number_of_shards": 3 } }))
    );
    assert_eq!(fixture.engine.mapping(INDEX, DOC_TYPE), Some(mapping()));
}

#[tokio::test]
async fn test_delete_missing_index_succeeds() {
    let fixture = Fixture::new(vec![]);
    let admin = administrator(&fixture, post_indexable().build().unwrap());

    admin.delete_index().await.unwrap();
    admin.create_index().await.unwrap();
    admin.delete_index().await.unwrap();

    assert!(!fixture.engine.has_index(INDEX));
}

#[tokio::test]
async fn test_refresh_missing_index_is_an_error() {
    let fixture = Fixture::new(vec![]);
    let admin = administrator(&fixture, post_indexable().build().unwrap());

    let result = admin.refresh_index().await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_clean_index_keeps_index() {
    let fixture = Fixture::new(numbered_posts(3));
    let admin = administrator(&fixture, post_indexable().build().unwrap());
    admin.create_index().await.unwrap();
    fixture.index_all();

    assert_eq!(admin.clean_index().await.unwrap(), 3);
    assert!(fixture.engine.has_index(INDEX));
    assert!(fixture.engine.document_ids(INDEX).is_empty());
}

#[tokio::test]
async fn test_reindex_skips_unprojectable_records() {
    let fixture = Fixture::new(numbered_posts(5));
    let indexable = post_indexable()
        .project_with(|post: &Post| {
            if post.id == 3 {
                return Err(SearchSyncError::projection("3", "title too long"));
            }
            Ok(json!({ "id": post.id, "title": post.title }))
        })
        .build()
        .unwrap();
    let admin = administrator(&fixture, indexable).with_batch_size(2);
    admin.create_index().await.unwrap();

    let summary = admin.reindex(&Scope::All, None, None).await.unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.indexed, 4);
    assert_eq!(summary.skipped, 1);
    assert!(summary.failed_batches.is_empty());
    assert!(!summary.is_complete());
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2", "4", "5"]);
}

#[tokio::test]
async fn test_reindex_continues_after_failed_batch() {
    let fixture = Fixture::new(numbered_posts(5));
    let admin = administrator(&fixture, post_indexable().build().unwrap()).with_batch_size(2);
    admin.create_index().await.unwrap();
    fixture.engine.fail_bulk_call(1);
    fixture.engine.reject_document("5");

    let summary = admin.reindex(&Scope::All, None, None).await.unwrap();

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.failed_batches, vec![1]);
    assert_eq!(summary.indexed, 2);
    assert_eq!(summary.failed_documents, 1);
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2"]);

    // Safe to run again once the engine recovers.
    let rerun = admin.reindex(&Scope::All, None, None).await.unwrap();
    assert!(rerun.failed_batches.is_empty());
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_reindex_single_page() {
    let fixture = Fixture::new(numbered_posts(7));
    let admin = administrator(&fixture, post_indexable().build().unwrap());
    admin.create_index().await.unwrap();

    let summary = admin.reindex(&Scope::All, Some(3), Some(2)).await.unwrap();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.indexed, 3);
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["4", "5", "6"]);
}

#[tokio::test]
async fn test_reindex_named_scope() {
    let fixture = Fixture::new(vec![
        Post::new(1, "live"),
        Post::draft(2, "draft"),
        Post::new(3, "live too"),
    ]);
    let admin = administrator(&fixture, post_indexable().build().unwrap());
    admin.create_index().await.unwrap();

    let summary = admin
        .reindex(&Scope::named("published"), None, None)
        .await
        .unwrap();
    assert_eq!(summary.indexed, 2);
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "3"]);

    let result = admin.reindex(&Scope::named("archived"), None, None).await;
    assert!(matches!(result, Err(SearchSyncError::StoreError(_))));
}

#[tokio::test]
async fn test_rebuild_replaces_index_contents() {
    let fixture = Fixture::new(numbered_posts(3));
    let indexable = Indexable::builder(descriptor_with_mapping())
        .projector(search_sync::DocumentProjector::serialized())
        .build()
        .unwrap();
    let admin = administrator(&fixture, indexable);
    admin.create_index().await.unwrap();
    fixture
        .engine
        .seed(INDEX, DOC_TYPE, "99", json!({ "id": 99, "title": "stale" }));

    let summary = admin.rebuild_index().await.unwrap();

    assert!(summary.is_complete());
    assert_eq!(summary.indexed, 3);
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2", "3"]);
    assert_eq!(fixture.engine.mapping(INDEX, DOC_TYPE), Some(mapping()));
    assert_eq!(fixture.engine.refresh_count(INDEX), 1);
}

#[tokio::test]
async fn test_rebuild_leaves_out_records_failing_conditions() {
    let fixture = Fixture::new(vec![
        Post::new(1, "live"),
        Post::new(2, "also live"),
        Post::draft(3, "draft"),
    ]);
    let indexable = post_indexable()
        .index_if(Predicate::named("is_published"))
        .build()
        .unwrap();
    let admin = administrator(&fixture, indexable);

    // Offline mode does not gate reindexing.
    let _offline = fixture.runtime.offline();
    let summary = admin.rebuild_index().await.unwrap();

    assert_eq!(summary.indexed, 2);
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.skipped, 0);
    assert!(summary.is_complete());
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2"]);
}

fn descriptor_with_mapping() -> IndexDescriptor {
    IndexDescriptor::new(INDEX, DOC_TYPE).with_mapping(mapping())
}

#[tokio::test]
async fn test_index_versions_deploy_and_prune() {
    let fixture = Fixture::new(numbered_posts(2));
    let admin = administrator(&fixture, post_indexable().build().unwrap());

    assert!(admin.current_index_version().await.unwrap().is_none());
    assert!(admin.prune_index_versions().await.unwrap().is_empty());

    let (first, summary) = admin.create_index_version().await.unwrap();
    assert_eq!(summary.indexed, 2);
    assert!(first.name.starts_with("blog_"));
    assert_eq!(fixture.engine.aliased_indices(INDEX), vec![first.name.clone()]);
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2"]);
    assert_eq!(fixture.engine.refresh_count(&first.name), 1);

    tokio::time::sleep(Duration::from_millis(5)).await;
    fixture.store.insert(Post::new(3, "new"));
    let (second, _) = admin.create_index_version().await.unwrap();

    assert_eq!(fixture.engine.aliased_indices(INDEX), vec![second.name.clone()]);
    assert_eq!(fixture.engine.document_ids(INDEX), vec!["1", "2", "3"]);
    assert_eq!(admin.current_index_version().await.unwrap(), Some(second.clone()));
    assert_eq!(
        admin.index_versions().await.unwrap(),
        vec![first.clone(), second.clone()]
    );

    let pruned = admin.prune_index_versions().await.unwrap();
    assert_eq!(pruned, vec![first.clone()]);
    assert!(!fixture.engine.has_index(&first.name));
    assert_eq!(admin.index_versions().await.unwrap(), vec![second]);
}

#[tokio::test]
async fn test_deploy_moves_alias_back() {
    let fixture = Fixture::new(numbered_posts(1));
    let admin = administrator(&fixture, post_indexable().build().unwrap());

    let (first, _) = admin.create_index_version().await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (second, _) = admin.create_index_version().await.unwrap();

    let previous = admin.deploy_index_version(&first).await.unwrap();

    assert_eq!(previous, vec![second.name]);
    assert_eq!(fixture.engine.aliased_indices(INDEX), vec![first.name]);
}

#[tokio::test]
async fn test_manager_health_check() {
    let fixture = Fixture::new(vec![]);
    let manager = IndexManager::new(fixture.engine.clone());

    assert!(manager.health_check().await.unwrap());
    fixture.engine.set_healthy(false);
    assert!(!manager.health_check().await.unwrap());
}
