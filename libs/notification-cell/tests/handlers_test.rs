use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use notification_cell::models::NotificationDraft;
use notification_cell::{notification_routes, NotificationEmitter};
use shared_models::notification::NotificationType;
use shared_utils::test_utils::{TestClinic, TestUser};

fn app(clinic: &TestClinic) -> Router {
    Router::new().nest("/api/notifications", notification_routes(clinic.state.clone()))
}

async fn send(
    clinic: &TestClinic,
    method: &str,
    uri: &str,
    user: &TestUser,
) -> (StatusCode, Value) {
    let response = app(clinic)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Authorization", clinic.bearer_for(user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn seed(clinic: &TestClinic, user_id: i64, count: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let draft = NotificationDraft::new(
            user_id,
            format!("Title {}", i),
            "Body",
            NotificationType::System,
        );
        let notification = NotificationEmitter::emit(clinic.repository.as_ref(), draft)
            .await
            .unwrap();
        ids.push(notification.id);
    }
    ids
}

#[tokio::test]
async fn test_list_returns_only_own_notifications_newest_first() {
    let clinic = TestClinic::new().await;
    seed(&clinic, clinic.patient.id, 2).await;
    seed(&clinic, clinic.doctor.id, 1).await;

    let (status, body) = send(&clinic, "GET", "/api/notifications", &clinic.patient).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let list = body["notifications"].as_array().unwrap();
    assert!(list.iter().all(|n| n["user_id"] == clinic.patient.id));
    assert!(list[0]["id"].as_i64() > list[1]["id"].as_i64());
}

#[tokio::test]
async fn test_other_users_notification_is_not_found() {
    let clinic = TestClinic::new().await;
    let ids = seed(&clinic, clinic.doctor.id, 1).await;

    let (status, body) = send(
        &clinic,
        "GET",
        &format!("/api/notifications/{}", ids[0]),
        &clinic.patient,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, _) = send(
        &clinic,
        "PUT",
        &format!("/api/notifications/{}/mark-read", ids[0]),
        &clinic.patient,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_read_updates_unread_views() {
    let clinic = TestClinic::new().await;
    let ids = seed(&clinic, clinic.patient.id, 3).await;

    let (status, body) = send(
        &clinic,
        "PUT",
        &format!("/api/notifications/{}/mark-read", ids[1]),
        &clinic.patient,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["is_read"], true);

    let (_, body) = send(&clinic, "GET", "/api/notifications/count-unread", &clinic.patient).await;
    assert_eq!(body["unread"], 2);

    let (_, body) = send(&clinic, "GET", "/api/notifications/unread", &clinic.patient).await;
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn test_mark_all_read_touches_only_caller() {
    let clinic = TestClinic::new().await;
    seed(&clinic, clinic.patient.id, 2).await;
    seed(&clinic, clinic.other_patient.id, 2).await;

    let (status, body) = send(&clinic, "PUT", "/api/notifications/mark-all-read", &clinic.patient).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, body) = send(
        &clinic,
        "GET",
        "/api/notifications/count-unread",
        &clinic.other_patient,
    )
    .await;
    assert_eq!(body["unread"], 2);
}

#[tokio::test]
async fn test_requires_authentication() {
    let clinic = TestClinic::new().await;

    let response = app(&clinic)
        .oneshot(
            Request::builder()
                .uri("/api/notifications")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
