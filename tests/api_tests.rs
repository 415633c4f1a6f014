use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};

use reel_order::{
    models::BulkReorderMode, routes::create_router, state::AppState, store::MemoryStore,
};

const OWNER: &str = "user_owner";
const OTHER: &str = "user_other";

async fn create_test_server(mode: BulkReorderMode) -> TestServer {
    let store = MemoryStore::new();
    store.insert_user(OWNER, Some("Owner")).await;
    store.insert_user(OTHER, None).await;

    let state = Arc::new(AppState::new(Arc::new(store), None, mode));
    TestServer::new(create_router(state)).unwrap()
}

fn as_user(request: TestRequest, subject: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", subject)).unwrap(),
    )
}

async fn create_collection(server: &TestServer, path: &str, name: &str) -> String {
    let response = as_user(server.post(path), OWNER)
        .json(&json!({ "name": name }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

async fn add_items(server: &TestServer, path: &str, titles: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for title in titles {
        let response = as_user(server.post(path), OWNER)
            .json(&json!({ "title": title }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        let item = body
            .as_object()
            .unwrap()
            .iter()
            .find(|(key, _)| key.ends_with("Item"))
            .map(|(_, item)| item.clone())
            .unwrap();
        ids.push(item["id"].as_str().unwrap().to_string());
    }
    ids
}

/// Returns `(id, position)` pairs in display order, plus the revision
async fn ordering(server: &TestServer, path: &str) -> (Vec<(String, i64)>, i64) {
    let response = as_user(server.get(path), OWNER).await;
    response.assert_status_ok();

    let body: Value = response.json();
    let items = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| {
            (
                item["id"].as_str().unwrap().to_string(),
                item["position"].as_i64().unwrap(),
            )
        })
        .collect();
    (items, body["version"].as_i64().unwrap())
}

fn ids(order: &[(String, i64)]) -> Vec<String> {
    order.iter().map(|(id, _)| id.clone()).collect()
}

/// A list holding A, B, C, D at positions 1..4
async fn seeded_list(server: &TestServer) -> (String, Vec<String>) {
    let list_id = create_collection(server, "/api/v1/lists", "Noir").await;
    let items = add_items(
        server,
        &format!("/api/v1/lists/{}/items", list_id),
        &["A", "B", "C", "D"],
    )
    .await;
    (list_id, items)
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-123"),
        )
        .await;

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-123"
    );
}

#[tokio::test]
async fn test_requests_without_principal_are_unauthorized() {
    let server = create_test_server(BulkReorderMode::Lenient).await;

    let response = server.post("/api/v1/lists").json(&json!({ "name": "x" })).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let response = as_user(server.get("/api/v1/watchlist"), "user_unknown").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_move_last_item_to_front() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let (a, b, c, d) = (&items[0], &items[1], &items[2], &items[3]);

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, d)),
        OWNER,
    )
    .json(&json!({ "position": 1 }))
    .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["listItem"]["id"], d.as_str());
    assert_eq!(body["listItem"]["position"], 1);

    let (order, _) = ordering(&server, &format!("/api/v1/lists/{}/items", list_id)).await;
    assert_eq!(
        order,
        vec![
            (d.clone(), 1),
            (a.clone(), 2),
            (b.clone(), 3),
            (c.clone(), 4)
        ]
    );
}

#[tokio::test]
async fn test_bulk_reorder_reverses_list() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/reorder", list_id)),
        OWNER,
    )
    .json(&json!({
        "items": [
            { "id": items[0], "position": 4 },
            { "id": items[1], "position": 3 },
            { "id": items[2], "position": 2 },
            { "id": items[3], "position": 1 },
        ]
    }))
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let (order, _) = ordering(&server, &format!("/api/v1/lists/{}/items", list_id)).await;
    let mut reversed = items.clone();
    reversed.reverse();
    assert_eq!(ids(&order), reversed);
    assert_eq!(
        order.iter().map(|(_, p)| *p).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

#[tokio::test]
async fn test_move_out_of_range_writes_nothing() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);
    let before = ordering(&server, &items_path).await;
    let item_path = format!("/api/v1/lists/{}/items/{}", list_id, items[0]);

    let response = as_user(server.patch(&item_path), OWNER)
        .json(&json!({ "position": 5 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Position must be between 1 and 4");

    for bad in [json!(0), json!(-2), json!("abc"), json!(1.5)] {
        let response = as_user(server.patch(&item_path), OWNER)
            .json(&json!({ "position": bad }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    assert_eq!(ordering(&server, &items_path).await, before);
}

#[tokio::test]
async fn test_noop_move_is_idempotent() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);
    let before = ordering(&server, &items_path).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[1])),
        OWNER,
    )
    .json(&json!({ "position": 2 }))
    .await;
    response.assert_status_ok();

    assert_eq!(ordering(&server, &items_path).await, before);
}

#[tokio::test]
async fn test_patch_without_fields_is_rejected() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[0])),
        OWNER,
    )
    .json(&json!({}))
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_note_only() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[2])),
        OWNER,
    )
    .json(&json!({ "note": "Best of the decade" }))
    .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["listItem"]["note"], "Best of the decade");
    assert_eq!(body["listItem"]["position"], 3);
}

#[tokio::test]
async fn test_bulk_partial_failure_reports_failed_ids() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let stranger = uuid::Uuid::new_v4().to_string();

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/reorder", list_id)),
        OWNER,
    )
    .json(&json!({
        "items": [
            { "id": items[0], "position": 2 },
            { "id": items[1], "position": 1 },
            { "id": stranger, "position": 3 },
        ]
    }))
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["failedIds"], json!([stranger]));

    let (order, _) = ordering(&server, &format!("/api/v1/lists/{}/items", list_id)).await;
    assert_eq!(order[0], (items[1].clone(), 1));
    assert_eq!(order[1], (items[0].clone(), 2));
}

#[tokio::test]
async fn test_bulk_requires_items() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, _) = seeded_list(&server).await;
    let path = format!("/api/v1/lists/{}/reorder", list_id);

    let response = as_user(server.patch(&path), OWNER)
        .json(&json!({ "items": [] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Items array is required");

    let response = as_user(server.patch(&path), OWNER).json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = as_user(server.patch(&path), OWNER)
        .json(&json!({ "items": "not-an-array" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_owner_is_forbidden_and_nothing_changes() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);
    let before = ordering(&server, &items_path).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[3])),
        OTHER,
    )
    .json(&json!({ "position": 1 }))
    .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/reorder", list_id)),
        OTHER,
    )
    .json(&json!({ "items": [{ "id": items[0], "position": 4 }] }))
    .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = as_user(server.get(&items_path), OTHER).await;
    response.assert_status(StatusCode::FORBIDDEN);

    assert_eq!(ordering(&server, &items_path).await, before);
}

#[tokio::test]
async fn test_missing_parent_and_item_are_not_found() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, _) = seeded_list(&server).await;
    let missing = uuid::Uuid::new_v4();

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", missing, missing)),
        OWNER,
    )
    .json(&json!({ "position": 1 }))
    .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, missing)),
        OWNER,
    )
    .json(&json!({ "position": 1 }))
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_id_is_not_a_playlist() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, _) = seeded_list(&server).await;

    let response = as_user(
        server.get(&format!("/api/v1/playlists/{}/items", list_id)),
        OWNER,
    )
    .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_leaves_gap_until_next_move() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);

    let response = as_user(
        server.delete(&format!("/api/v1/lists/{}/items/{}", list_id, items[1])),
        OWNER,
    )
    .await;
    response.assert_status_ok();

    let appended = add_items(&server, &items_path, &["E"]).await;
    let (order, _) = ordering(&server, &items_path).await;
    assert_eq!(
        order.iter().map(|(_, p)| *p).collect::<Vec<_>>(),
        vec![1, 3, 4, 5]
    );

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, appended[0])),
        OWNER,
    )
    .json(&json!({ "position": 1 }))
    .await;
    response.assert_status_ok();

    let (order, _) = ordering(&server, &items_path).await;
    assert_eq!(
        order,
        vec![
            (appended[0].clone(), 1),
            (items[0].clone(), 2),
            (items[2].clone(), 3),
            (items[3].clone(), 4),
        ]
    );
}

#[tokio::test]
async fn test_stale_expected_version_conflicts() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);
    let (_, version) = ordering(&server, &items_path).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[3])),
        OWNER,
    )
    .json(&json!({ "position": 1, "expectedVersion": version }))
    .await;
    response.assert_status_ok();

    // Same token again is now stale
    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/reorder", list_id)),
        OWNER,
    )
    .json(&json!({
        "items": [{ "id": items[0], "position": 4 }],
        "expectedVersion": version
    }))
    .await;
    response.assert_status(StatusCode::CONFLICT);

    let (order, current) = ordering(&server, &items_path).await;
    assert_eq!(current, version + 1);
    assert_eq!(order[0].0, items[3]);
}

#[tokio::test]
async fn test_playlist_sequences_are_independent() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let playlist_id = create_collection(&server, "/api/v1/playlists", "Weekend").await;
    let tmdb_path = format!("/api/v1/playlists/{}/items", playlist_id);
    let youtube_path = format!("/api/v1/playlists/{}/youtube-items", playlist_id);

    let movies = add_items(&server, &tmdb_path, &["Heat", "Ronin"]).await;
    let clips = add_items(&server, &youtube_path, &["Trailer", "Review", "Essay"]).await;

    let response = as_user(
        server.patch(&format!("{}/{}", youtube_path, clips[2])),
        OWNER,
    )
    .json(&json!({ "order": 1 }))
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["youtubePlaylistItem"]["position"], 1);

    let response = as_user(
        server.patch(&format!("/api/v1/playlists/{}/reorder", playlist_id)),
        OWNER,
    )
    .json(&json!({
        "itemType": "tmdb",
        "items": [
            { "id": movies[0], "order": 2 },
            { "id": movies[1], "order": 1 },
        ]
    }))
    .await;
    response.assert_status_ok();

    let (tmdb_order, _) = ordering(&server, &tmdb_path).await;
    assert_eq!(ids(&tmdb_order), vec![movies[1].clone(), movies[0].clone()]);

    let (youtube_order, _) = ordering(&server, &youtube_path).await;
    assert_eq!(
        ids(&youtube_order),
        vec![clips[2].clone(), clips[0].clone(), clips[1].clone()]
    );

    // A catalogue id is foreign to the YouTube sequence
    let response = as_user(
        server.patch(&format!("/api/v1/playlists/{}/reorder", playlist_id)),
        OWNER,
    )
    .json(&json!({
        "itemType": "youtube",
        "items": [{ "id": movies[0], "order": 1 }]
    }))
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["failedIds"], json!([movies[0]]));
}

#[tokio::test]
async fn test_playlist_item_patch_uses_order() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let playlist_id = create_collection(&server, "/api/v1/playlists", "Weekend").await;
    let tmdb_path = format!("/api/v1/playlists/{}/items", playlist_id);
    let movies = add_items(&server, &tmdb_path, &["Heat", "Ronin", "Thief"]).await;

    let response = as_user(server.patch(&format!("{}/{}", tmdb_path, movies[0])), OWNER)
        .json(&json!({ "order": 3, "note": "save for last" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["playlistItem"]["position"], 3);
    assert_eq!(body["playlistItem"]["note"], "save for last");
}

#[tokio::test]
async fn test_youtube_move_requires_order() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let playlist_id = create_collection(&server, "/api/v1/playlists", "Clips").await;
    let youtube_path = format!("/api/v1/playlists/{}/youtube-items", playlist_id);
    let clips = add_items(&server, &youtube_path, &["Trailer"]).await;

    let response = as_user(server.patch(&format!("{}/{}", youtube_path, clips[0])), OWNER)
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_watchlist_is_scoped_to_principal() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let items = add_items(&server, "/api/v1/watchlist", &["Alien", "Aliens"]).await;

    let response = as_user(server.patch("/api/v1/watchlist/reorder"), OWNER)
        .json(&json!({
            "items": [
                { "id": items[0], "order": 2 },
                { "id": items[1], "order": 1 },
            ]
        }))
        .await;
    response.assert_status_ok();

    let (order, _) = ordering(&server, "/api/v1/watchlist").await;
    assert_eq!(ids(&order), vec![items[1].clone(), items[0].clone()]);

    // Another user's watchlist does not contain these ids
    let response = as_user(server.patch("/api/v1/watchlist/reorder"), OTHER)
        .json(&json!({ "items": [{ "id": items[0], "order": 1 }] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = as_user(server.delete(&format!("/api/v1/watchlist/{}", items[0])), OTHER).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_atomic_mode_rejects_whole_batch() {
    let server = create_test_server(BulkReorderMode::Atomic).await;
    let (list_id, items) = seeded_list(&server).await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);
    let before = ordering(&server, &items_path).await;
    let stranger = uuid::Uuid::new_v4().to_string();

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/reorder", list_id)),
        OWNER,
    )
    .json(&json!({
        "items": [
            { "id": items[0], "position": 4 },
            { "id": stranger, "position": 1 },
        ]
    }))
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["failedIds"], json!([stranger]));

    assert_eq!(ordering(&server, &items_path).await, before);
}

#[tokio::test]
async fn test_strict_mode_requires_permutation() {
    let server = create_test_server(BulkReorderMode::Strict).await;
    let (list_id, items) = seeded_list(&server).await;
    let path = format!("/api/v1/lists/{}/reorder", list_id);

    let response = as_user(server.patch(&path), OWNER)
        .json(&json!({
            "items": [
                { "id": items[0], "position": 1 },
                { "id": items[1], "position": 1 },
                { "id": items[2], "position": 3 },
                { "id": items[3], "position": 4 },
            ]
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = as_user(server.patch(&path), OWNER)
        .json(&json!({
            "items": [
                { "id": items[0], "position": 2 },
                { "id": items[1], "position": 1 },
                { "id": items[2], "position": 4 },
                { "id": items[3], "position": 3 },
            ]
        }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_note_only_patch_with_stale_version_conflicts() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let list_id = create_collection(&server, "/api/v1/lists", "Noir").await;
    let items_path = format!("/api/v1/lists/{}/items", list_id);
    let items = add_items(&server, &items_path, &["Laura"]).await;
    let item_path = format!("{}/{}", items_path, items[0]);

    let response = as_user(server.patch(&item_path), OWNER)
        .json(&json!({ "note": "x", "expectedVersion": 0 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let response = as_user(server.get(&items_path), OWNER).await;
    let body: Value = response.json();
    assert_eq!(body["items"][0]["note"], Value::Null);
    assert_eq!(body["version"], 1);

    let response = as_user(server.patch(&item_path), OWNER)
        .json(&json!({ "note": "x", "expectedVersion": 1 }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_patch_response_carries_version_for_chaining() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[3])),
        OWNER,
    )
    .json(&json!({ "position": 1, "note": "opener", "expectedVersion": 4 }))
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["version"], 6);

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[0])),
        OWNER,
    )
    .json(&json!({ "position": 1, "expectedVersion": body["version"] }))
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["listItem"]["position"], 1);
    assert_eq!(body["version"], 7);
}

#[tokio::test]
async fn test_oversized_position_reports_range() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, items) = seeded_list(&server).await;

    let response = as_user(
        server.patch(&format!("/api/v1/lists/{}/items/{}", list_id, items[0])),
        OWNER,
    )
    .json(&json!({ "position": 3_000_000_000i64 }))
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Position must be between 1 and 4");
}

#[tokio::test]
async fn test_malformed_path_id_is_json_bad_request() {
    let server = create_test_server(BulkReorderMode::Lenient).await;
    let (list_id, _) = seeded_list(&server).await;

    let response = as_user(server.get("/api/v1/lists/not-a-uuid/items"), OWNER).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());

    let response = as_user(
        server.delete(&format!("/api/v1/lists/{}/items/nope", list_id)),
        OWNER,
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}
