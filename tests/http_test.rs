//! End-to-end requests through the router, backed by the in-memory store.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Extension, Router,
};
use club_hub::{
    auth::{generate_jwt, Identity},
    store::Store,
};
use common::*;
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;

fn app(store: &Store) -> Router {
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    club_hub::app().layer(Extension(store.clone()))
}

fn bearer(identity: &Identity) -> String {
    let token = generate_jwt(identity, Duration::from_secs(60 * 60)).expect("sign token");
    format!("Bearer {token}")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    caller: Option<&Identity>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        req = req.header(header::AUTHORIZATION, bearer(caller));
    }
    let body = match body {
        Some(body) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let res = app.oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = hyper::body::to_bytes(res.into_body()).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn new_club(name: &str, funding_type: &str) -> Value {
    json!({
        "name": name,
        "introduction": "weekly meetups",
        "region": REGION,
        "categoryId": 3,
        "joinMode": "AUTO",
        "fundingType": funding_type,
    })
}

#[tokio::test]
async fn create_club_returns_the_created_records() {
    let store = Store::memory();
    let (status, body) = send(
        app(&store),
        Method::POST,
        "/api/club",
        Some(&user(10)),
        Some(new_club("runners", "FREE")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "club created");
    assert_eq!(body["data"]["club"]["status"], "ACTIVE");
    assert_eq!(body["data"]["club"]["leaderId"], 10);
    assert_eq!(body["data"]["member"]["status"], "JOIN");
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let store = Store::memory();
    let (status, body) = send(
        app(&store),
        Method::POST,
        "/api/club",
        None,
        Some(new_club("runners", "FREE")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHORIZED");
}

#[tokio::test]
async fn joining_from_another_region_is_a_bad_request() {
    let store = Store::memory();
    let club = free_club(&store, "runners", 10).await;
    let traveller = Identity {
        region: "busan".to_string(),
        ..user(20)
    };

    let (status, body) = send(
        app(&store),
        Method::POST,
        &format!("/api/club/{}/join", club.id),
        Some(&traveller),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "BAD_REQUEST");
    assert_eq!(body["message"], "cannot join a club in another region");
}

#[tokio::test]
async fn only_admins_change_club_status() {
    let store = Store::memory();
    let (_, body) = send(
        app(&store),
        Method::POST,
        "/api/club",
        Some(&user(10)),
        Some(new_club("cooking", "PAID")),
    )
    .await;
    let club_id = body["data"]["club"]["id"].as_i64().unwrap();
    let activate = format!("/api/club/{club_id}/activate");

    let (status, _) = send(app(&store), Method::POST, &activate, Some(&user(10)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(app(&store), Method::POST, &activate, Some(&admin()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ACTIVE");

    let (status, body) = send(
        app(&store),
        Method::GET,
        &format!("/api/club/{club_id}/status"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ACTIVE");
}

#[tokio::test]
async fn static_routes_are_not_taken_for_club_ids() {
    let store = Store::memory();
    free_club(&store, "runners", 10).await;

    let (status, body) = send(
        app(&store),
        Method::GET,
        "/api/club/me",
        Some(&user(10)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(
        app(&store),
        Method::GET,
        "/api/club/type?type=FREE",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "returning the clubs of this type");
}

#[tokio::test]
async fn schedule_flow_over_http() {
    let store = Store::memory();
    let club = free_club(&store, "runners", 10).await;
    let leader = user(10);

    let (status, body) = send(
        app(&store),
        Method::POST,
        &format!("/api/club/{}/schedule", club.id),
        Some(&leader),
        Some(json!({
            "title": "morning run",
            "place": "han river",
            "maxAttendee": 1,
            "startDate": "2024-06-01T10:00:00",
            "endDate": "2024-06-01T12:00:00",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let schedule_id = body["data"]["id"].as_i64().unwrap();
    let seat = format!("/api/club/{}/schedule/{schedule_id}", club.id);

    let (status, _) = send(app(&store), Method::POST, &seat, Some(&leader), None).await;
    assert_eq!(status, StatusCode::OK);

    join_all(&store, club.id, [20]).await;
    let (status, body) = send(app(&store), Method::POST, &seat, Some(&user(20)), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "the schedule is already full");

    let (status, body) = send(
        app(&store),
        Method::GET,
        "/api/club/me/schedules",
        Some(&leader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], schedule_id);
}
