use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::{appointment_routes, public_appointment_routes};
use payment_cell::{payment_routes, FixedGateway};
use shared_database::ClinicRepository;
use shared_utils::test_utils::{TestClinic, TestUser};

fn app(clinic: &TestClinic) -> Router {
    Router::new()
        .nest("/api/appointments", appointment_routes(clinic.state.clone()))
        .nest(
            "/api/public/appointments",
            public_appointment_routes(clinic.state.clone()),
        )
        .nest(
            "/api/payments",
            payment_routes(clinic.state.clone(), Arc::new(FixedGateway::approving())),
        )
}

async fn call(
    clinic: &TestClinic,
    method: &str,
    uri: &str,
    user: Option<&TestUser>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("Authorization", clinic.bearer_for(user));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app(clinic)
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn booking(clinic: &TestClinic) -> Value {
    json!({
        "doctor_id": clinic.doctor.id,
        "patient_id": clinic.patient.id,
        "title": "Knee pain",
        "appointment_date_time": "2031-03-10T09:00:00",
        "is_video_consultation": true
    })
}

#[tokio::test]
async fn test_requires_authentication() {
    let clinic = TestClinic::new().await;

    let (status, body) = call(&clinic, "GET", "/api/appointments/my-appointments", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "authentication_error");
}

#[tokio::test]
async fn test_create_and_fetch() {
    let clinic = TestClinic::new().await;

    let (status, body) = call(
        &clinic,
        "POST",
        "/api/appointments",
        Some(&clinic.patient),
        Some(booking(&clinic)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["appointment"]["status"], "PENDING");
    assert_eq!(body["appointment"]["payment_status"], "UNPAID");
    let id = body["appointment"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &clinic,
        "GET",
        &format!("/api/appointments/{}", id),
        Some(&clinic.doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Knee pain");

    let (status, _) = call(
        &clinic,
        "GET",
        &format!("/api/appointments/{}", id),
        Some(&clinic.other_patient),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_title_is_bad_request() {
    let clinic = TestClinic::new().await;
    let mut body = booking(&clinic);
    body["title"] = json!("");

    let (status, body) = call(&clinic, "POST", "/api/appointments", Some(&clinic.patient), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn test_reject_with_and_without_body() {
    let clinic = TestClinic::new().await;

    for (index, payload) in [Some(json!({"reason": "Doctor unavailable"})), None].into_iter().enumerate() {
        let (_, created) = call(
            &clinic,
            "POST",
            "/api/appointments",
            Some(&clinic.patient),
            Some(booking(&clinic)),
        )
        .await;
        let id = created["appointment"]["id"].as_i64().unwrap();

        let (status, body) = call(
            &clinic,
            "PUT",
            &format!("/api/appointments/{}/reject", id),
            Some(&clinic.doctor),
            payload,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appointment"]["status"], "CANCELLED");
        let expected = if index == 0 { "Doctor unavailable" } else { "No reason provided" };
        assert_eq!(body["appointment"]["rejection_reason"], expected);
    }
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let clinic = TestClinic::new().await;
    let (_, created) = call(
        &clinic,
        "POST",
        "/api/appointments",
        Some(&clinic.patient),
        Some(booking(&clinic)),
    )
    .await;
    let id = created["appointment"]["id"].as_i64().unwrap();

    let complete = format!("/api/appointments/{}/complete", id);
    let (status, _) = call(&clinic, "PUT", &complete, Some(&clinic.doctor), None).await;
    assert_eq!(status, StatusCode::OK);

    let confirm = format!("/api/appointments/{}/confirm", id);
    let (status, body) = call(&clinic, "PUT", &confirm, Some(&clinic.doctor), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict_error");
}

#[tokio::test]
async fn test_date_range_query() {
    let clinic = TestClinic::new().await;
    call(
        &clinic,
        "POST",
        "/api/appointments",
        Some(&clinic.patient),
        Some(booking(&clinic)),
    )
    .await;

    let (status, body) = call(
        &clinic,
        "GET",
        "/api/appointments/date-range?start=2031-03-10T00:00:00&end=2031-03-10T09:00:00Z",
        Some(&clinic.patient),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = call(
        &clinic,
        "GET",
        "/api/appointments/date-range?start=2031-03-11T00:00:00&end=2031-03-10T00:00:00",
        Some(&clinic.patient),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_simple_endpoint_accepts_anonymous_and_authenticated_callers() {
    let clinic = TestClinic::new().await;

    let (status, _) = call(&clinic, "POST", "/api/appointments/simple", None, Some(booking(&clinic))).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut body = booking(&clinic);
    body["patient_id"] = json!(clinic.other_patient.id);
    let (status, created) = call(
        &clinic,
        "POST",
        "/api/appointments/simple",
        Some(&clinic.patient),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["appointment"]["patient_id"], clinic.patient.id);
}

#[tokio::test]
async fn test_public_endpoint_requires_both_parties() {
    let clinic = TestClinic::new().await;
    let mut body = booking(&clinic);
    body.as_object_mut().unwrap().remove("patient_id");

    let (status, body) = call(&clinic, "POST", "/api/public/appointments", None, Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Patient ID is required");
}

#[tokio::test]
async fn test_doctor_listing_is_restricted() {
    let clinic = TestClinic::new().await;
    let uri = format!("/api/appointments/doctor/{}", clinic.doctor.id);

    let (status, _) = call(&clinic, "GET", &uri, Some(&clinic.other_doctor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&clinic, "GET", &uri, Some(&clinic.admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["doctor_id"], clinic.doctor.id);
}

/// Patient books, doctor confirms, patient pays, doctor refunds.
#[tokio::test]
async fn test_booking_to_refund_scenario() {
    let clinic = TestClinic::new().await;

    let (status, created) = call(
        &clinic,
        "POST",
        "/api/appointments",
        Some(&clinic.patient),
        Some(booking(&clinic)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["appointment"]["id"].as_i64().unwrap();

    let (status, _) = call(
        &clinic,
        "PUT",
        &format!("/api/appointments/{}/confirm", id),
        Some(&clinic.doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, paid) = call(
        &clinic,
        "POST",
        "/api/payments/process",
        Some(&clinic.patient),
        Some(json!({"appointment_id": id, "amount": 50.0, "payment_method": "CARD"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment"]["payment_status"], "PAID");
    assert!(paid["payment"]["payment_reference"]
        .as_str()
        .unwrap()
        .starts_with("PAY_"));

    let (status, refunded) = call(
        &clinic,
        "POST",
        &format!("/api/payments/{}/refund", id),
        Some(&clinic.doctor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refunded["payment_status"], "REFUNDED");
    assert_eq!(refunded["appointment_status"], "APPROVED");

    let mut kinds = Vec::new();
    for user_id in [clinic.doctor.id, clinic.patient.id] {
        for n in clinic.repository.list_notifications(user_id, false).await.unwrap() {
            kinds.push((n.user_id, format!("{:?}", n.notification_type)));
        }
    }
    kinds.sort();
    assert_eq!(
        kinds,
        vec![
            (clinic.doctor.id, "AppointmentRequested".to_string()),
            (clinic.patient.id, "AppointmentConfirmed".to_string()),
        ]
    );
}
