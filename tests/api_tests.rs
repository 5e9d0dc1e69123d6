use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use epj_tracker::cache::{CacheConfig, ProjectionCache};
use epj_tracker::config::EnvironmentConfig;
use epj_tracker::create_router;
use epj_tracker::models::{EquipmentUnit, Role, User};
use epj_tracker::repositories::{EquipmentRegistry, MemoryStore, Repositories, UserRegistry};
use epj_tracker::services::{BcryptHasher, PasswordHasher};
use epj_tracker::state::AppState;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let hasher = BcryptHasher::new(4);

        let accounts = [
            ("boss", "adminpw", Role::Admin, "HQ"),
            ("alice", "alicepw", Role::Driver, "ACME"),
            ("lou", "loupw", Role::LoadSupport, ""),
        ];
        let users = accounts
            .iter()
            .map(|(name, password, role, carrier)| User {
                username: name.to_string(),
                password_hash: hasher.hash(password).unwrap(),
                role: *role,
                carrier: carrier.to_string(),
            })
            .collect();
        store.insert_users(users).await.unwrap();
        for unit in ["E1", "E2"] {
            store.add_equipment(EquipmentUnit::new(unit, false)).await.unwrap();
        }

        let state = AppState::with_hasher(
            EnvironmentConfig::default(),
            Repositories::from_store(store.clone()),
            ProjectionCache::in_memory(CacheConfig::default()),
            Arc::new(hasher),
        );
        Self {
            router: create_router(state),
            store,
        }
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true, "login failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "epj_tracker");
}

#[tokio::test]
async fn test_login_is_case_insensitive_and_audited() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({
                "username": "ALICE",
                "password": "alicepw",
                "latitude": 39.5839,
                "longitude": -76.0261
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "Driver");

    let audit = app.store.login_audit().await;
    assert_eq!(audit.len(), 1);
    assert!(audit[0].at_warehouse);
}

#[tokio::test]
async fn test_bad_credentials_do_not_say_which_half_was_wrong() {
    let app = TestApp::new().await;

    for (username, password) in [("alice", "nope"), ("nobody", "alicepw")] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error: Invalid username or password.");
    }
    assert_eq!(app.store.login_audit().await.len(), 2);
}

#[tokio::test]
async fn test_requests_without_a_session_are_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app.send(Method::GET, "/api/equipment/statuses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/equipment/statuses", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_and_check_in_over_http() {
    let app = TestApp::new().await;
    let token = app.login("alice", "alicepw").await;

    let (status, body) = app
        .post(
            "/api/trips/checkout",
            &token,
            json!({ "equipment_id": "E1", "driver_name": "Alice A", "route": "R7" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Successfully checked out EPJ E1.");
    let trip_id = body["data"]["trip_id"].as_str().unwrap().to_string();

    let (_, body) = app.get("/api/equipment/statuses", &token).await;
    let e1 = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["equipment_id"] == "E1")
        .unwrap()
        .clone();
    assert_eq!(e1["status"], "Checked Out");

    let (_, body) = app.get("/api/trips/mine", &token).await;
    assert_eq!(body["data"]["trip_id"], trip_id.as_str());

    let (_, body) = app.send(Method::GET, "/api/auth/active-drivers", None, None).await;
    assert_eq!(body["data"][0]["username"], "alice");
    assert_eq!(body["data"][0]["display_name"], "Alice A");

    let (status, body) = app
        .post("/api/trips/checkin", &token, json!({ "check_in_zone": "Dock 2" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully checked in EPJ E1.");

    let (_, body) = app.get("/api/trips/mine", &token).await;
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_lost_race_is_a_message_not_a_failure() {
    let app = TestApp::new().await;
    let alice = app.login("alice", "alicepw").await;
    let boss = app.login("boss", "adminpw").await;

    app.post(
        "/api/trips/checkout",
        &boss,
        json!({ "equipment_id": "E1", "driver_name": "Boss" }),
    )
    .await;

    let (status, body) = app
        .post(
            "/api/trips/checkout",
            &alice,
            json!({ "equipment_id": "E1", "driver_name": "Alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Error: EPJ E1 is no longer available. It may have just been checked out."
    );

    let (status, body) = app.post("/api/trips/checkin", &alice, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Error: No active trip found.");
}

#[tokio::test]
async fn test_role_gates() {
    let app = TestApp::new().await;
    let alice = app.login("alice", "alicepw").await;
    let lou = app.login("lou", "loupw").await;

    let (status, _) = app.get("/api/admin/dashboard", &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/trips/checkout",
            &lou,
            json!({ "equipment_id": "E1", "driver_name": "Lou" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/equipment/location",
            &lou,
            json!({ "equipment_id": "E2", "new_location": "Dock 9" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = app.get("/api/equipment/overview", &lou).await;
    let e2 = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["equipment_id"] == "E2")
        .unwrap()
        .clone();
    assert_eq!(e2["location"], "Dock 9");
}

#[tokio::test]
async fn test_invalid_bodies_are_rejected() {
    let app = TestApp::new().await;
    let boss = app.login("boss", "adminpw").await;

    let (status, body) = app
        .post("/api/admin/users", &boss, json!({ "username": "", "password": "x", "role": "Driver" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .post("/api/trips/checkout", &boss, json!({ "driver_name": "Boss" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_user_management() {
    let app = TestApp::new().await;
    let boss = app.login("boss", "adminpw").await;

    let (_, body) = app
        .post(
            "/api/admin/users",
            &boss,
            json!({ "username": "dan", "password": "danpw", "role": "Driver", "carrier": "XPO" }),
        )
        .await;
    assert_eq!(body["message"], "User \"dan\" created successfully.");
    app.login("dan", "danpw").await;

    let (status, _) = app
        .post(
            "/api/admin/users",
            &boss,
            json!({ "username": "DAN", "password": "x", "role": "Driver" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .post(
            "/api/admin/users/bulk",
            &boss,
            json!({ "csv_data": "erin,pw,Driver,ACME\nfrank,pw,Pilot,ACME\n" }),
        )
        .await;
    assert_eq!(body["data"]["created"], 1);
    assert_eq!(
        body["message"],
        "Batch process complete. Successfully created 1 users. Skipped 1 rows due to errors. First error: Line 2: Invalid role \"Pilot\". Must be Admin, Driver, or Load Support."
    );

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/admin/users/erin",
            Some(&boss),
            Some(json!({ "role": "Load Support", "carrier": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/admin/users", &boss).await;
    let erin = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "erin")
        .unwrap()
        .clone();
    assert_eq!(erin["role"], "Load Support");

    let (status, _) = app
        .send(Method::DELETE, "/api/admin/users/erin", Some(&boss), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::DELETE, "/api/admin/users/erin", Some(&boss), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_change_password_and_logout() {
    let app = TestApp::new().await;
    let token = app.login("alice", "alicepw").await;

    let (_, body) = app
        .post(
            "/api/auth/password",
            &token,
            json!({ "current_password": "wrong", "new_password": "fresh" }),
        )
        .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Error: Incorrect current password.");

    let (_, body) = app
        .post(
            "/api/auth/password",
            &token,
            json!({ "current_password": "alicepw", "new_password": "fresh" }),
        )
        .await;
    assert_eq!(body["message"], "Password updated successfully!");
    app.login("alice", "fresh").await;

    let (status, _) = app
        .send(Method::POST, "/api/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get("/api/trips/mine", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_equipment_lifecycle() {
    let app = TestApp::new().await;
    let boss = app.login("boss", "adminpw").await;
    let alice = app.login("alice", "alicepw").await;

    let (_, body) = app
        .post("/api/admin/equipment", &boss, json!({ "equipment_id": "E3" }))
        .await;
    assert_eq!(body["success"], true);

    let (_, body) = app
        .post(
            "/api/admin/maintenance",
            &boss,
            json!({ "equipment_id": "E3", "action": "Maintenance Start", "reason": "brakes" }),
        )
        .await;
    assert_eq!(body["message"], "EPJ E3 status updated.");

    let (_, body) = app
        .post(
            "/api/trips/checkout",
            &alice,
            json!({ "equipment_id": "E3", "driver_name": "Alice" }),
        )
        .await;
    assert_eq!(body["success"], false);

    let (_, body) = app
        .post(
            "/api/trips/checkout",
            &alice,
            json!({ "equipment_id": "E2", "driver_name": "Alice" }),
        )
        .await;
    let trip_id = body["data"]["trip_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::DELETE, "/api/admin/equipment/E2", Some(&boss), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/api/admin/active-trips", &boss).await;
    assert_eq!(body["data"][0]["trip_id"], trip_id.as_str());

    let (_, body) = app
        .post("/api/admin/worked", &boss, json!({ "trip_id": trip_id, "worked": true }))
        .await;
    assert_eq!(body["success"], true);

    let (_, body) = app
        .post("/api/admin/force-checkin", &boss, json!({ "trip_id": trip_id }))
        .await;
    assert_eq!(body["success"], true);

    let (_, body) = app
        .post("/api/admin/force-checkin", &boss, json!({ "trip_id": "TRIP-MISSING" }))
        .await;
    assert_eq!(body["message"], "Error: Could not find original trip ID TRIP-MISSING.");

    let (_, body) = app.get("/api/admin/dashboard", &boss).await;
    assert_eq!(body["data"]["maintenance_log"][0]["equipment_id"], "E3");
    assert!(body["data"]["active_checkouts"].as_array().unwrap().is_empty());

    let (status, _) = app
        .send(Method::DELETE, "/api/admin/equipment/E2", Some(&boss), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.post("/api/admin/zones", &boss, json!({ "name": "Dock 12" })).await;
    assert_eq!(body["success"], true);
    let (_, body) = app.get("/api/equipment/zones", &alice).await;
    assert!(body["data"].as_array().unwrap().iter().any(|z| z == "Dock 12"));
}
