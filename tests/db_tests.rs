//! Store-level tests on an in-memory database: uniqueness, cascade
//! deletion, chunk ordering and pagination.

use std::sync::Arc;

use quarry::db::{
    AssetStore, ChunkStore, DbClient, NewChunk, ProjectStore, QueryLogStore, UserStore,
    ASSET_TYPE_FILE,
};
use quarry::ErrorCode;
use serde_json::json;

async fn stores() -> (
    Arc<DbClient>,
    UserStore,
    ProjectStore,
    AssetStore,
    ChunkStore,
    QueryLogStore,
) {
    let db = Arc::new(DbClient::new_memory().await.unwrap());
    (
        db.clone(),
        UserStore::new(db.clone()),
        ProjectStore::new(db.clone()),
        AssetStore::new(db.clone()),
        ChunkStore::new(db.clone()),
        QueryLogStore::new(db),
    )
}

fn chunk_row(project_id: i64, asset_id: i64, order: i64, text: &str) -> NewChunk {
    NewChunk {
        chunk_text: text.to_string(),
        chunk_metadata: json!({ "chunk_index": order - 1, "chunking_method": "simple" }),
        chunk_order: order,
        chunk_project_id: project_id,
        chunk_asset_id: asset_id,
    }
}

#[tokio::test]
async fn test_user_email_unique_case_insensitive() {
    let (_db, users, ..) = stores().await;

    users.insert("Alice@Example.com", "hash-1").await.unwrap();
    let err = users
        .insert("alice@example.com", "hash-2")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::AuthUserAlreadyExists);
}

#[tokio::test]
async fn test_project_code_unique_per_user() {
    let (_db, users, projects, ..) = stores().await;

    let u1 = users.insert("u1@example.com", "hash").await.unwrap();
    let u2 = users.insert("u2@example.com", "hash").await.unwrap();

    projects.insert(u1.user_id, 1).await.unwrap();

    // Same code for the same user collides
    let err = projects.insert(u1.user_id, 1).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProjectAlreadyExists);

    // Same code for a different user is fine
    projects.insert(u2.user_id, 1).await.unwrap();
}

#[tokio::test]
async fn test_get_or_create_returns_existing_row() {
    let (_db, users, projects, ..) = stores().await;
    let user = users.insert("u@example.com", "hash").await.unwrap();

    let first = projects.get_or_create(user.user_id, 5).await.unwrap();
    let second = projects.get_or_create(user.user_id, 5).await.unwrap();

    assert_eq!(first.project_id, second.project_id);
    assert_eq!(first.project_uuid, second.project_uuid);
}

#[tokio::test]
async fn test_listing_is_scoped_to_the_user() {
    let (_db, users, projects, ..) = stores().await;

    let u1 = users.insert("u1@example.com", "hash").await.unwrap();
    let u2 = users.insert("u2@example.com", "hash").await.unwrap();

    projects.insert(u1.user_id, 1).await.unwrap();
    projects.insert(u1.user_id, 2).await.unwrap();
    projects.insert(u2.user_id, 9).await.unwrap();

    let (mine, total_pages) = projects.list_for_user(u1.user_id, 1, 10).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(total_pages, 1);
    assert!(mine.iter().all(|p| p.user_id == u1.user_id));

    let (theirs, _) = projects.list_for_user(u2.user_id, 1, 10).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].project_code, 9);
}

#[tokio::test]
async fn test_project_delete_cascades_to_assets_and_chunks() {
    let (_db, users, projects, assets, chunks, _logs) = stores().await;

    let user = users.insert("u@example.com", "hash").await.unwrap();
    let project = projects.get_or_create(user.user_id, 1).await.unwrap();
    let asset = assets
        .insert(project.project_id, ASSET_TYPE_FILE, "k_doc.txt", 42)
        .await
        .unwrap();

    chunks
        .insert_many(
            &[
                chunk_row(project.project_id, asset.asset_id, 1, "first"),
                chunk_row(project.project_id, asset.asset_id, 2, "second"),
            ],
            100,
        )
        .await
        .unwrap();

    assert!(projects.delete(project.project_id).await.unwrap());

    assert_eq!(assets.count_by_project(project.project_id).await.unwrap(), 0);
    assert_eq!(chunks.total_count(project.project_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_asset_lookup_by_name_and_id() {
    let (_db, users, projects, assets, ..) = stores().await;

    let user = users.insert("u@example.com", "hash").await.unwrap();
    let project = projects.get_or_create(user.user_id, 1).await.unwrap();
    let asset = assets
        .insert(project.project_id, ASSET_TYPE_FILE, "k_doc.txt", 42)
        .await
        .unwrap();

    let by_name = assets
        .get_by_name(project.project_id, "k_doc.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.asset_id, asset.asset_id);

    let by_id = assets
        .get_by_id(asset.asset_id, project.project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id.asset_name, "k_doc.txt");

    // Wrong project never resolves the asset
    assert!(assets
        .get_by_id(asset.asset_id, project.project_id + 1)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_chunk_order_is_contiguous_and_paged_reads_are_stable() {
    let (_db, users, projects, assets, chunks, _logs) = stores().await;

    let user = users.insert("u@example.com", "hash").await.unwrap();
    let project = projects.get_or_create(user.user_id, 1).await.unwrap();
    let asset = assets
        .insert(project.project_id, ASSET_TYPE_FILE, "k_doc.txt", 42)
        .await
        .unwrap();

    let rows: Vec<NewChunk> = (1..=7)
        .map(|i| chunk_row(project.project_id, asset.asset_id, i, &format!("chunk {i}")))
        .collect();
    let inserted = chunks.insert_many(&rows, 3).await.unwrap();
    assert_eq!(inserted, 7);

    assert_eq!(chunks.total_count(project.project_id).await.unwrap(), 7);

    // Page through in stable order and recover the contiguous sequence
    let mut seen_orders = Vec::new();
    let mut page = 1;
    loop {
        let page_chunks = chunks.get_page(project.project_id, page, 3).await.unwrap();
        if page_chunks.is_empty() {
            break;
        }
        seen_orders.extend(page_chunks.iter().map(|c| c.chunk_order));
        page += 1;
    }

    assert_eq!(seen_orders, (1..=7).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_chunk_metadata_round_trip() {
    let (_db, users, projects, assets, chunks, _logs) = stores().await;

    let user = users.insert("u@example.com", "hash").await.unwrap();
    let project = projects.get_or_create(user.user_id, 1).await.unwrap();
    let asset = assets
        .insert(project.project_id, ASSET_TYPE_FILE, "k_doc.txt", 42)
        .await
        .unwrap();

    chunks
        .insert_many(&[chunk_row(project.project_id, asset.asset_id, 1, "text")], 10)
        .await
        .unwrap();

    let stored = chunks.get_page(project.project_id, 1, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].chunk_metadata["chunking_method"], "simple");
    assert_eq!(stored[0].chunk_metadata["chunk_index"], 0);
}

#[tokio::test]
async fn test_delete_chunks_by_asset_keeps_other_assets() {
    let (_db, users, projects, assets, chunks, _logs) = stores().await;

    let user = users.insert("u@example.com", "hash").await.unwrap();
    let project = projects.get_or_create(user.user_id, 1).await.unwrap();
    let a1 = assets
        .insert(project.project_id, ASSET_TYPE_FILE, "k_a.txt", 1)
        .await
        .unwrap();
    let a2 = assets
        .insert(project.project_id, ASSET_TYPE_FILE, "k_b.txt", 1)
        .await
        .unwrap();

    chunks
        .insert_many(
            &[
                chunk_row(project.project_id, a1.asset_id, 1, "a1 chunk"),
                chunk_row(project.project_id, a2.asset_id, 1, "a2 chunk"),
            ],
            10,
        )
        .await
        .unwrap();

    let removed = chunks
        .delete_by_asset(project.project_id, a1.asset_id)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(chunks.total_count(project.project_id).await.unwrap(), 1);

    let ids = chunks
        .ids_by_asset(project.project_id, a2.asset_id)
        .await
        .unwrap();
    assert_eq!(ids.len(), 1);
}

#[tokio::test]
async fn test_query_log_insert() {
    let (_db, users, _projects, _assets, _chunks, logs) = stores().await;

    let user = users.insert("u@example.com", "hash").await.unwrap();
    let log = logs
        .insert(
            user.user_id,
            "What is the capital of France?",
            "Paris.",
            12.5,
        )
        .await
        .unwrap();

    assert!(log.log_id > 0);
    assert!(!log.log_uuid.is_empty());
    assert_eq!(log.response_time_ms, 12.5);
}
