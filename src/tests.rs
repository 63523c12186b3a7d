//! End-to-end tests through the HTTP surface with the in-memory store.

use std::{net::SocketAddr, sync::Arc};

use actix_web::{
    App,
    http::{StatusCode, header::AUTHORIZATION},
    middleware::NormalizePath,
    test::{self, TestRequest},
    web::Data,
};
use serde_json::{Value, json};

use crate::{config::Config, routes, state::AppState, store::MemoryStore};

const ADMIN: (&str, &str) = ("root", "root-password");

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

async fn state() -> Data<AppState> {
    let mut config = Config::for_tests();
    config.bootstrap_admin = Some((ADMIN.0.into(), ADMIN.1.into()));
    let state = Data::new(AppState::new(config, Arc::new(MemoryStore::new())));
    state.ensure_bootstrap_admin().await.unwrap();
    state
}

macro_rules! app {
    ($state:expr) => {{
        let state = $state.clone();
        let config = state.config.clone();
        test::init_service(
            App::new()
                .wrap(NormalizePath::trim())
                .app_data(state)
                .configure(move |cfg| routes::configure(cfg, &config)),
        )
        .await
    }};
}

fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (AUTHORIZATION, format!("Bearer {token}"))
}

fn get(uri: &str) -> TestRequest {
    TestRequest::get().uri(uri).peer_addr(peer())
}

fn post(uri: &str) -> TestRequest {
    TestRequest::post().uri(uri).peer_addr(peer())
}

fn put(uri: &str) -> TestRequest {
    TestRequest::put().uri(uri).peer_addr(peer())
}

macro_rules! login {
    ($app:expr, $name:expr, $password:expr) => {{
        let resp = test::call_service(
            &$app,
            post("/auth/login")
                .set_json(json!({"username": $name, "password": $password}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }};
}

macro_rules! register_and_login {
    ($app:expr, $name:expr, $dept:expr) => {{
        let resp = test::call_service(
            &$app,
            post("/auth/register")
                .set_json(json!({"username": $name, "password": "password-123", "department_id": $dept}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let identity: Value = test::read_body_json(resp).await;
        let tokens = login!($app, $name, "password-123");
        (identity["id"].as_u64().unwrap(), tokens)
    }};
}

#[actix_web::test]
async fn protected_routes_require_a_token() {
    let state = state().await;
    let app = app!(state);

    let resp = test::call_service(&app, get("/api/me").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let resp = test::call_service(
        &app,
        get("/api/me").insert_header(bearer("garbage")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_TOKEN");
}

#[actix_web::test]
async fn registration_grants_quota_and_me_shows_it() {
    let state = state().await;
    let app = app!(state);
    let (_, (access, _)) = register_and_login!(app, "alice", 1);

    let resp = test::call_service(
        &app,
        get("/api/me").insert_header(bearer(&access)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["identity"]["role"], "employee");
    assert!(body["identity"].get("password_hash").is_none());
    let casual = body["balances"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["leave_type"] == "casual")
        .unwrap();
    assert_eq!(casual["balance"], "12");

    let resp = test::call_service(
        &app,
        get("/api/leave/balances/casual")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["leave_type"], "casual");
    assert_eq!(body["balance"], "12");

    let resp = test::call_service(
        &app,
        get("/api/leave/balances/vacation")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn duplicate_username_conflicts() {
    let state = state().await;
    let app = app!(state);
    register_and_login!(app, "bob", 1);

    let resp = test::call_service(
        &app,
        post("/auth/register")
            .set_json(json!({"username": "BOB", "password": "password-123"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn wrong_password_is_rejected() {
    let state = state().await;
    let app = app!(state);
    register_and_login!(app, "carol", 1);

    let resp = test::call_service(
        &app,
        post("/auth/login")
            .set_json(json!({"username": "carol", "password": "nope-nope"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[actix_web::test]
async fn employees_cannot_reach_admin_scope() {
    let state = state().await;
    let app = app!(state);
    let (_, (access, _)) = register_and_login!(app, "dave", 1);

    let resp = test::call_service(
        &app,
        get("/api/admin/users").insert_header(bearer(&access)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "FORBIDDEN");

    let (admin_access, _) = login!(app, ADMIN.0, ADMIN.1);
    let resp = test::call_service(
        &app,
        get("/api/admin/users")
            .insert_header(bearer(&admin_access))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn deactivation_takes_effect_on_existing_tokens() {
    let state = state().await;
    let app = app!(state);
    let (user_id, (access, _)) = register_and_login!(app, "erin", 1);
    let (admin_access, _) = login!(app, ADMIN.0, ADMIN.1);

    let resp = test::call_service(
        &app,
        put(&format!("/api/admin/users/{user_id}/active"))
            .insert_header(bearer(&admin_access))
            .set_json(json!({"active": false}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        get("/api/me").insert_header(bearer(&access)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "ACCOUNT_DEACTIVATED");

    let resp = test::call_service(
        &app,
        post("/auth/login")
            .set_json(json!({"username": "erin", "password": "password-123"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn refresh_rotates_and_old_token_is_dead() {
    let state = state().await;
    let app = app!(state);
    let (_, (access, refresh)) = register_and_login!(app, "frank", 1);

    // access tokens cannot refresh
    let resp = test::call_service(
        &app,
        post("/auth/refresh").insert_header(bearer(&access)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        post("/auth/refresh").insert_header(bearer(&refresh)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let rotated = body["refresh_token"].as_str().unwrap().to_string();

    let resp = test::call_service(
        &app,
        post("/auth/refresh").insert_header(bearer(&refresh)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        post("/auth/logout").insert_header(bearer(&rotated)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        post("/auth/refresh").insert_header(bearer(&rotated)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn apply_reject_restores_balance_end_to_end() {
    let state = state().await;
    let app = app!(state);
    let (_, (access, _)) = register_and_login!(app, "grace", 1);
    let (admin_access, _) = login!(app, ADMIN.0, ADMIN.1);

    // Mon..Tue
    let resp = test::call_service(
        &app,
        post("/api/leave")
            .insert_header(bearer(&access))
            .set_json(json!({
                "category": "casual",
                "start_date": "2026-03-02",
                "end_date": "2026-03-03"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    let id = created["id"].as_u64().unwrap();
    assert_eq!(created["status"], "pending");

    let casual_balance = |body: &Value| {
        body.as_array()
            .unwrap()
            .iter()
            .find(|b| b["leave_type"] == "casual")
            .unwrap()["balance"]
            .clone()
    };

    let resp = test::call_service(
        &app,
        get("/api/leave/balances")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(casual_balance(&body), "10");

    // the owner cannot decide
    let resp = test::call_service(
        &app,
        put(&format!("/api/leave/{id}/approve"))
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        put(&format!("/api/leave/{id}/reject"))
            .insert_header(bearer(&admin_access))
            .set_json(json!({"comment": "team offsite"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let decided: Value = test::read_body_json(resp).await;
    assert_eq!(decided["status"], "rejected");
    assert_eq!(decided["decision_comment"], "team offsite");

    let resp = test::call_service(
        &app,
        get("/api/leave/balances")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(casual_balance(&body), "12");

    let resp = test::call_service(
        &app,
        put(&format!("/api/leave/{id}/approve"))
            .insert_header(bearer(&admin_access))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[actix_web::test]
async fn holidays_are_scoped_by_optional_auth() {
    let state = state().await;
    let app = app!(state);
    let (_, (access, _)) = register_and_login!(app, "heidi", 7);
    let (admin_access, _) = login!(app, ADMIN.0, ADMIN.1);

    for (date, dept) in [("2026-05-01", Value::Null), ("2026-05-04", json!(7))] {
        let resp = test::call_service(
            &app,
            post("/api/admin/holidays")
                .insert_header(bearer(&admin_access))
                .set_json(json!({"date": date, "label": "Holiday", "department_id": dept}))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = test::call_service(&app, get("/holidays?year=2026").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let anonymous: Value = test::read_body_json(resp).await;
    assert_eq!(anonymous.as_array().unwrap().len(), 1);

    let resp = test::call_service(
        &app,
        get("/holidays?year=2026")
            .insert_header(bearer(&access))
            .to_request(),
    )
    .await;
    let scoped: Value = test::read_body_json(resp).await;
    assert_eq!(scoped.as_array().unwrap().len(), 2);

    // a bad token does not fail the public route
    let resp = test::call_service(
        &app,
        get("/holidays?year=2026")
            .insert_header(bearer("garbage"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn admin_accrual_run_is_idempotent() {
    let state = state().await;
    let app = app!(state);
    register_and_login!(app, "ivan", 1);
    let (admin_access, _) = login!(app, ADMIN.0, ADMIN.1);

    let run = || {
        post("/api/admin/accrual/run")
            .insert_header(bearer(&admin_access))
            .set_json(json!({"period": "2026-01"}))
            .to_request()
    };

    let resp = test::call_service(&app, run()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first: Value = test::read_body_json(resp).await;
    // ivan and the bootstrap admin
    assert_eq!(first["credited"], 2);

    let resp = test::call_service(&app, run()).await;
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(second["credited"], 0);
    assert_eq!(second["skipped"], 2);
}
