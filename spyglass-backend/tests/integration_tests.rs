use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use spyglass_backend::create_app;
use spyglass_db::{Database, NewPlayer, NewRecord, NewServer};
use tower::ServiceExt;
// for `oneshot` method

const NOW: i64 = 1700000000;

/// Helper to create test database with in-memory SQLite
async fn setup_test_db() -> Database {
    Database::open_in_memory()
        .await
        .expect("Failed to create in-memory database")
}

/// Helper to create app with default test configuration
fn create_test_app(db: Database) -> axum::Router {
    let config = spyglass_backend::config::Config::default();
    create_app(db, config.request_body_limit, config.request_timeout)
}

/// Helper to send a request and get response
async fn send_request(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

async fn seed_server(db: &Database, address: &str, name: &str, kind: &str, discovered_at: i64) {
    db.upsert_server(
        NewServer {
            address: address.to_string(),
            name: Some(name.to_string()),
            kind: kind.to_string(),
            source: format!("https://example.org/server/{name}"),
        },
        discovered_at,
    )
    .await
    .expect("Failed to seed server");
}

async fn seed_record(db: &Database, address: &str, online: u32, players: Vec<NewPlayer>) -> i64 {
    db.save_record(
        NewRecord {
            id: None,
            server_address: address.to_string(),
            used_query: false,
            max_players: 20,
            online_players: online,
            motd: "A Minecraft Server".to_string(),
            latency_ms: 42.5,
            version_name: "1.20.4".to_string(),
            version_brand: None,
            map_name: None,
            gamemode: None,
            icon: None,
            plugins: None,
            players,
        },
        NOW,
    )
    .await
    .expect("Failed to seed record")
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    // GIVEN: A running application
    let db = setup_test_db().await;
    let app = create_test_app(db);

    // WHEN: Making a GET request to /health
    let (status, _body) = send_request(app, "GET", "/health").await;

    // THEN: Should return 200 OK
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint_with_post_method() {
    // GIVEN: A running application
    let db = setup_test_db().await;
    let app = create_test_app(db);

    // WHEN: Making a POST request to /health (wrong method)
    let (status, _body) = send_request(app, "POST", "/health").await;

    // THEN: Should return 405 Method Not Allowed
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// SERVER ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_server_list_empty() {
    // GIVEN: An empty database
    let db = setup_test_db().await;
    let app = create_test_app(db);

    // WHEN: Listing servers
    let (status, body) = send_request(app, "GET", "/servers").await;

    // THEN: 200 with an empty list
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["servers"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_server_list_newest_first() {
    // GIVEN: Two servers discovered at different times
    let db = setup_test_db().await;
    seed_server(&db, "old.example.com:25565", "Old", "java", NOW).await;
    seed_server(&db, "new.example.com:25565", "New", "java", NOW + 60).await;
    let app = create_test_app(db);

    // WHEN: Listing servers
    let (status, body) = send_request(app, "GET", "/servers").await;

    // THEN: The newest discovery comes first
    assert_eq!(status, StatusCode::OK);
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0]["address"], "new.example.com:25565");
    assert_eq!(servers[1]["address"], "old.example.com:25565");
}

#[tokio::test]
async fn test_server_list_filter_by_substring() {
    // GIVEN: Two differently named servers
    let db = setup_test_db().await;
    seed_server(&db, "alpha.example.com:25565", "Alpha", "java", NOW).await;
    seed_server(&db, "beta.example.com:25565", "Beta", "java", NOW).await;
    let app = create_test_app(db);

    // WHEN: Filtering with a substring
    let (status, body) = send_request(app, "GET", "/servers?q=Alph").await;

    // THEN: Only the matching server is returned
    assert_eq!(status, StatusCode::OK);
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["name"], "Alpha");
}

#[tokio::test]
async fn test_server_list_filter_by_kind() {
    // GIVEN: A Java and a Bedrock server
    let db = setup_test_db().await;
    seed_server(&db, "java.example.com:25565", "Java", "java", NOW).await;
    seed_server(&db, "pocket.example.com:19132", "Pocket", "bedrock", NOW).await;
    let app = create_test_app(db);

    // WHEN: Filtering by kind
    let (status, body) = send_request(app, "GET", "/servers?kind=bedrock").await;

    // THEN: Only the Bedrock server is returned
    assert_eq!(status, StatusCode::OK);
    let servers = body["servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["address"], "pocket.example.com:19132");
}

#[tokio::test]
async fn test_server_list_rejects_page_zero() {
    // GIVEN: A running application
    let db = setup_test_db().await;
    let app = create_test_app(db);

    // WHEN: Requesting page 0
    let (status, _body) = send_request(app, "GET", "/servers?page=0").await;

    // THEN: Should return 400 Bad Request
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_server_detail_includes_recent_records() {
    // GIVEN: A server with one record
    let db = setup_test_db().await;
    seed_server(&db, "play.example.com:25565", "Play", "java", NOW).await;
    seed_record(&db, "play.example.com:25565", 5, Vec::new()).await;
    let app = create_test_app(db);

    // WHEN: Fetching the detail page
    let (status, body) = send_request(app, "GET", "/servers/play.example.com:25565").await;

    // THEN: Server fields plus its records come back
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["server"]["address"], "play.example.com:25565");
    assert_eq!(body["server"]["kind"], "java");
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["online_players"], 5);
    assert_eq!(records[0]["used_query"], false);
}

#[tokio::test]
async fn test_server_detail_unknown_address() {
    // GIVEN: An empty database
    let db = setup_test_db().await;
    let app = create_test_app(db);

    // WHEN: Fetching an untracked address
    let (status, body) = send_request(app, "GET", "/servers/nope.example.com:25565").await;

    // THEN: Should return 404 with an error body
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("error").is_some());
}

// =============================================================================
// RECORD ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_records_list_scoped_to_server() {
    // GIVEN: Records on two servers
    let db = setup_test_db().await;
    seed_server(&db, "one.example.com:25565", "One", "java", NOW).await;
    seed_server(&db, "two.example.com:25565", "Two", "java", NOW).await;
    seed_record(&db, "one.example.com:25565", 1, Vec::new()).await;
    seed_record(&db, "two.example.com:25565", 2, Vec::new()).await;
    let app = create_test_app(db);

    // WHEN: Listing records for one server
    let (status, body) = send_request(app, "GET", "/records?server=one.example.com:25565").await;

    // THEN: Only that server's records are returned
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["server_address"], "one.example.com:25565");
}

#[tokio::test]
async fn test_records_list_unfiltered() {
    let db = setup_test_db().await;
    seed_server(&db, "one.example.com:25565", "One", "java", NOW).await;
    seed_record(&db, "one.example.com:25565", 1, Vec::new()).await;
    seed_record(&db, "one.example.com:25565", 2, Vec::new()).await;
    let app = create_test_app(db);

    let (status, body) = send_request(app, "GET", "/records").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
}

// =============================================================================
// PLAYER ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_player_listing_and_detail() {
    // GIVEN: A record that sampled two players
    let db = setup_test_db().await;
    seed_server(&db, "play.example.com:25565", "Play", "java", NOW).await;
    seed_record(
        &db,
        "play.example.com:25565",
        2,
        vec![
            NewPlayer {
                uuid: "069a79f4-44e9-4726-a5be-fca90e38aaf5".to_string(),
                username: "Notch".to_string(),
                premium: true,
            },
            NewPlayer {
                uuid: "853c80ef-3c37-49fd-aa49-938b674adae6".to_string(),
                username: "jeb_".to_string(),
                premium: true,
            },
        ],
    )
    .await;
    let app = create_test_app(db.clone());

    // WHEN: Listing players
    let (status, body) = send_request(app, "GET", "/players").await;

    // THEN: Both players, ordered by username
    assert_eq!(status, StatusCode::OK);
    let players = body["players"].as_array().unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["username"], "Notch");
    assert_eq!(players[1]["username"], "jeb_");

    // WHEN: Fetching one player by uuid
    let app = create_test_app(db);
    let (status, body) = send_request(
        app,
        "GET",
        "/players/069a79f4-44e9-4726-a5be-fca90e38aaf5",
    )
    .await;

    // THEN: The detail comes back
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "Notch");
    assert_eq!(body["premium"], true);
    assert_eq!(body["first_seen_at"], NOW);
}

#[tokio::test]
async fn test_player_list_filter() {
    let db = setup_test_db().await;
    seed_server(&db, "play.example.com:25565", "Play", "java", NOW).await;
    seed_record(
        &db,
        "play.example.com:25565",
        1,
        vec![NewPlayer {
            uuid: "069a79f4-44e9-4726-a5be-fca90e38aaf5".to_string(),
            username: "Notch".to_string(),
            premium: true,
        }],
    )
    .await;
    let app = create_test_app(db);

    let (status, body) = send_request(app, "GET", "/players?q=Herobrine").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["players"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_player_detail_unknown_uuid() {
    // GIVEN: An empty database
    let db = setup_test_db().await;
    let app = create_test_app(db);

    // WHEN: Fetching an unknown uuid
    let (status, body) = send_request(
        app,
        "GET",
        "/players/00000000-0000-0000-0000-000000000000",
    )
    .await;

    // THEN: Should return 404
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("error").is_some());
}
