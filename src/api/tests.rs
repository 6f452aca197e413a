use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use super::create_router;
use crate::config::{Config, Environment};
use crate::db::{Listing, MemoryStore, SqliteStore};
use crate::AppState;

fn listing(id: &str, city: &str, kind: &str, price: u32) -> Listing {
    serde_json::from_value(json!({
        "id": id,
        "title": format!("Room {}", id),
        "type": kind,
        "price": price,
        "location": {"city": city, "country": "Australia"},
        "amenities": ["wifi"],
        "createdAt": "2024-03-01T00:00:00Z"
    }))
    .unwrap()
}

fn scenario_listings() -> Vec<Listing> {
    vec![
        listing("p1", "Sydney", "PrivateRoom", 200),
        listing("p2", "Sydney", "Studio", 300),
        listing("p3", "Melbourne", "SharedRoom", 150),
    ]
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = Some("router-test-secret".to_string());
    config.rate_limit.enabled = false;
    config
}

fn setup_with(config: Config, listings: Vec<Listing>) -> (Router, Arc<AppState>) {
    let store = Arc::new(MemoryStore::with_listings(listings).unwrap());
    let state = Arc::new(AppState::new(config, store));
    (create_router(state.clone()), state)
}

fn setup(listings: Vec<Listing>) -> (Router, Arc<AppState>) {
    setup_with(test_config(), listings)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/auth/register",
            json!({"email": email, "password": "hunter2hunter2", "name": "Test Student"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_reports_listing_count() {
    let (app, _) = setup(scenario_listings());
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["properties"], 3);
    assert_eq!(body["storage"], "memory");
    assert!(body["uptimeSeconds"].is_u64());
}

#[tokio::test]
async fn test_root_describes_service() {
    let (app, _) = setup(vec![]);
    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "unistay");
    assert!(body["endpoints"].as_array().unwrap().len() >= 8);
}

#[tokio::test]
async fn test_city_filter_sorted_by_price_desc() {
    let (app, _) = setup(scenario_listings());
    let (status, body) = send(&app, get("/api/properties?city=sydney&sort=price_desc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["p2", "p1"]);
}

#[tokio::test]
async fn test_listing_query_ignores_malformed_params() {
    let (app, _) = setup(scenario_listings());
    let (status, body) = send(
        &app,
        get("/api/properties?minPrice=abc&page=-1&limit=zero&sort=bogus&unknown=1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["totalPages"], 1);
}

#[tokio::test]
async fn test_listing_wire_format() {
    let (app, _) = setup(scenario_listings());
    let (status, body) = send(&app, get("/api/properties/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "p1");
    assert_eq!(body["type"], "private_room");
    assert_eq!(body["location"]["city"], "Sydney");
    assert_eq!(body["createdAt"], "2024-03-01T00:00:00Z");
}

#[tokio::test]
async fn test_missing_property_is_404() {
    let (app, _) = setup(scenario_listings());
    let (status, body) = send(&app, get("/api/properties/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (app, _) = setup(vec![]);
    let (status, body) = send(&app, get("/api/nothing-here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Not found");
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let (app, _) = setup(vec![]);
    let (status, body) = send(&app, get("/api/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalProperties"], 0);
    assert_eq!(body["cities"], 0);
    assert_eq!(body["averagePrice"], 0);
    assert_eq!(body["propertyTypes"], json!({}));
}

#[tokio::test]
async fn test_stats_over_listings() {
    let (app, _) = setup(scenario_listings());
    let (_, body) = send(&app, get("/api/stats")).await;
    assert_eq!(body["totalProperties"], 3);
    assert_eq!(body["cities"], 2);
    assert_eq!(body["citiesList"], json!(["Sydney", "Melbourne"]));
    assert_eq!(body["averagePrice"], 217);
    assert_eq!(body["propertyTypes"]["studio"], 1);
}

#[tokio::test]
async fn test_register_returns_token_and_user() {
    let (app, _) = setup(vec![]);
    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/register",
            json!({"email": "ana@uni.edu", "password": "hunter2hunter2", "name": "Ana", "role": "landlord"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], "ana@uni.edu");
    assert_eq!(body["user"]["role"], "landlord");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_is_400() {
    let (app, state) = setup(vec![]);
    register(&app, "ana@uni.edu").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/register",
            json!({"email": "ANA@uni.edu", "password": "another-password", "name": "Other"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(state.store.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_register_missing_fields_is_400() {
    let (app, state) = setup(vec![]);
    let (status, body) = send(
        &app,
        post_json("/api/auth/register", json!({"email": "ana@uni.edu"}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["password"].is_array());
    assert!(body["error"]["details"]["name"].is_array());
    assert_eq!(state.store.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (app, _) = setup(vec![]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_login() {
    let (app, _) = setup(vec![]);
    register(&app, "ana@uni.edu").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({"email": "Ana@Uni.edu", "password": "hunter2hunter2"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({"email": "ana@uni.edu", "password": "wrong-password"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            json!({"email": "nobody@uni.edu", "password": "hunter2hunter2"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        post_json("/api/auth/login", json!({"email": "ana@uni.edu"}), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_me_returns_caller() {
    let (app, _) = setup(vec![]);
    let token = register(&app, "ana@uni.edu").await;
    let (status, body) = send(&app, get_with_token("/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ana@uni.edu");
}

#[tokio::test]
async fn test_bookings_require_token() {
    let (app, _) = setup(scenario_listings());

    let (status, _) = send(&app, get("/api/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with_token("/api/bookings", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        post_json(
            "/api/bookings",
            json!({"propertyId": "p1", "checkIn": "2025-02-01", "checkOut": "2025-03-01"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_another_secret_is_403() {
    let (app, _) = setup(vec![]);
    let token = register(&app, "ana@uni.edu").await;

    let mut config = test_config();
    config.auth.jwt_secret = Some("some-other-secret".to_string());
    let (other_app, _) = setup_with(config, vec![]);

    let (status, _) = send(&other_app, get_with_token("/api/bookings", &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_booking_uses_caller_identity() {
    let (app, _) = setup(scenario_listings());
    let token = register(&app, "ana@uni.edu").await;
    let (_, me) = send(&app, get_with_token("/api/auth/me", &token)).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/bookings",
            json!({
                "propertyId": "p1",
                "checkIn": "2025-02-01",
                "checkOut": "2025-06-30",
                "userId": "someone-else"
            }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let booking = &body["booking"];
    assert_eq!(booking["propertyId"], "p1");
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["userId"], me["id"]);
}

#[tokio::test]
async fn test_booking_unknown_property_is_404() {
    let (app, _) = setup(scenario_listings());
    let token = register(&app, "ana@uni.edu").await;
    let (status, _) = send(
        &app,
        post_json(
            "/api/bookings",
            json!({"propertyId": "p404", "checkIn": "2025-02-01", "checkOut": "2025-03-01"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, get_with_token("/api/bookings", &token)).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_booking_missing_fields_is_400() {
    let (app, _) = setup(scenario_listings());
    let token = register(&app, "ana@uni.edu").await;
    let (status, body) = send(
        &app,
        post_json("/api/bookings", json!({"propertyId": "p1"}), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["checkIn"].is_array());
}

#[tokio::test]
async fn test_bookings_are_private_to_their_owner() {
    let (app, _) = setup(scenario_listings());
    let ana = register(&app, "ana@uni.edu").await;
    let ben = register(&app, "ben@uni.edu").await;

    for (token, property) in [(&ana, "p1"), (&ben, "p2"), (&ana, "p3")] {
        let (status, _) = send(
            &app,
            post_json(
                "/api/bookings",
                json!({"propertyId": property, "checkIn": "2025-02-01", "checkOut": "2025-03-01"}),
                Some(token.as_str()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, ana_bookings) = send(&app, get_with_token("/api/bookings", &ana)).await;
    let properties: Vec<&str> = ana_bookings
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["propertyId"].as_str().unwrap())
        .collect();
    assert_eq!(properties, vec!["p3", "p1"]);

    let (_, ben_bookings) = send(&app, get_with_token("/api/bookings", &ben)).await;
    assert_eq!(ben_bookings.as_array().unwrap().len(), 1);
    assert_eq!(ben_bookings[0]["propertyId"], "p2");
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.auth_requests_per_window = 2;
    let (app, _) = setup_with(config, vec![]);

    let login = || {
        post_json(
            "/api/auth/login",
            json!({"email": "x@uni.edu", "password": "whatever1"}),
            None,
        )
    };

    for _ in 0..2 {
        let (status, _) = send(&app, login()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    let (status, body) = send(&app, login()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "too_many_requests");

    // Listing endpoints use a separate budget
    let (status, _) = send(&app, get("/api/properties")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_the_budget() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.auth_requests_per_window = 2;
    let (app, _) = setup_with(config, vec![]);

    let mut statuses = Vec::new();
    for i in 0..5 {
        let mut request = post_json(
            "/api/auth/login",
            json!({"email": "x@uni.edu", "password": "whatever1"}),
            None,
        );
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("10.9.9.{}", i).parse().unwrap(),
        );
        let (status, _) = send(&app, request).await;
        statuses.push(status);
    }

    assert_eq!(&statuses[..2], &[StatusCode::UNAUTHORIZED, StatusCode::UNAUTHORIZED]);
    assert!(statuses[2..]
        .iter()
        .all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_trusted_forwarded_for_keys_each_client() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.auth_requests_per_window = 1;
    config.rate_limit.trust_proxy_headers = true;
    let (app, _) = setup_with(config, vec![]);

    for client in ["203.0.113.1", "203.0.113.2"] {
        let mut request = post_json(
            "/api/auth/login",
            json!({"email": "x@uni.edu", "password": "whatever1"}),
            None,
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "client {}", client);
    }
}

async fn store_with_corrupt_listing() -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().await.unwrap();
    sqlx::query(
        "INSERT INTO properties (id, title, property_type, price, city, created_at) \
         VALUES ('bad', 'Broken', 'studio', 100, 'Hobart', 'not-a-date')",
    )
    .execute(store.pool())
    .await
    .unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_corrupt_store_row_is_generic_500() {
    let state = Arc::new(AppState::new(test_config(), store_with_corrupt_listing().await));
    let app = create_router(state);

    let (status, body) = send(&app, get("/api/properties")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "internal_error");
    assert_eq!(body["error"]["message"], "Internal server error");
    assert!(!body.to_string().contains("not-a-date"));
}

#[tokio::test]
async fn test_development_mode_includes_internal_detail() {
    let mut config = test_config();
    config.server.environment = Environment::Development;
    let state = Arc::new(AppState::new(config, store_with_corrupt_listing().await));
    assert!(state.expose_internal_errors);
    let app = create_router(state);

    let (status, body) = send(&app, get("/api/properties/bad")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Internal server error: "), "{}", message);
    assert!(message.contains("not-a-date"));

    // A production router in the same process stays redacted
    let production = create_router(Arc::new(AppState::new(
        test_config(),
        store_with_corrupt_listing().await,
    )));
    let (_, body) = send(&production, get("/api/properties/bad")).await;
    assert_eq!(body["error"]["message"], "Internal server error");
}
