use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use regex::Regex;
use serde_json::{json, Value};
use tower::ServiceExt;

use payment_cell::models::PaymentError;
use payment_cell::{payment_routes, FixedGateway, PaymentGateway, PaymentProcessor};
use shared_database::{ClinicRepository, MemoryRepository};
use shared_models::appointment::{Appointment, AppointmentStatus, NewAppointment, PaymentStatus};
use shared_models::auth::{Actor, Role};
use shared_utils::test_utils::{TestClinic, TestUser};

fn appointment(patient_id: i64, doctor_id: i64) -> NewAppointment {
    let now = Utc::now();
    NewAppointment {
        patient_id,
        doctor_id,
        appointment_date_time: now + Duration::days(2),
        title: "Checkup".to_string(),
        description: None,
        notes: None,
        status: AppointmentStatus::Approved,
        is_video_consultation: false,
        meeting_link: None,
        payment_status: PaymentStatus::Unpaid,
        created_at: now,
        updated_at: now,
    }
}

async fn insert_appointments(
    repository: &MemoryRepository,
    count: usize,
    patient_id: i64,
    doctor_id: i64,
) -> Vec<i64> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let created = repository
            .insert_appointment(appointment(patient_id, doctor_id), None)
            .await
            .unwrap();
        ids.push(created.id);
    }
    ids
}

async fn stored(repository: &MemoryRepository, id: i64) -> Appointment {
    repository.find_appointment(id).await.unwrap().unwrap()
}

fn processor(
    repository: Arc<MemoryRepository>,
    gateway: impl PaymentGateway + 'static,
) -> PaymentProcessor {
    PaymentProcessor::new(repository, Arc::new(gateway))
}

const PATIENT: Actor = Actor { id: 4, role: Role::Patient };
const DOCTOR: Actor = Actor { id: 2, role: Role::Doctor };

#[tokio::test]
async fn test_forced_success_marks_paid_with_reference() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    let paid = payments
        .process_payment(ids[0], 50.0, "card", &PATIENT)
        .await
        .unwrap();

    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.payment_amount, Some(50.0));
    assert_eq!(paid.payment_method.as_deref(), Some("card"));
    assert_eq!(paid.payment_notes.as_deref(), Some("Payment processed successfully"));
    assert!(paid.payment_date.is_some());
    assert_eq!(paid.status, AppointmentStatus::Approved);

    let pattern = Regex::new(r"^PAY_[A-Z0-9]{8}$").unwrap();
    assert!(pattern.is_match(paid.payment_reference.as_deref().unwrap()));
}

#[tokio::test]
async fn test_references_are_unique_across_many_payments() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1000, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    let mut references = HashSet::new();
    for id in ids {
        let paid = payments.process_payment(id, 20.0, "card", &PATIENT).await.unwrap();
        references.insert(paid.payment_reference.unwrap());
    }

    assert_eq!(references.len(), 1000);
}

#[tokio::test]
async fn test_forced_failure_commits_unpaid_note() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::declining());

    let result = payments.process_payment(ids[0], 50.0, "card", &PATIENT).await;
    assert_matches!(result, Err(PaymentError::Declined));

    let stored = stored(&repository, ids[0]).await;
    assert_eq!(stored.payment_status, PaymentStatus::Unpaid);
    assert_eq!(stored.payment_notes.as_deref(), Some("Payment failed - please try again"));
    assert!(stored.payment_reference.is_none());
}

#[tokio::test]
async fn test_only_the_patient_can_pay() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    let stranger = Actor::new(5, Role::Patient);
    let result = payments.process_payment(ids[0], 50.0, "card", &stranger).await;
    assert_matches!(result, Err(PaymentError::NotPatient));

    let result = payments.process_payment(999, 50.0, "card", &PATIENT).await;
    assert_matches!(result, Err(PaymentError::AppointmentNotFound));
}

#[tokio::test]
async fn test_invalid_amount_and_method_are_rejected() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    for amount in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let result = payments.process_payment(ids[0], amount, "card", &PATIENT).await;
        assert_matches!(result, Err(PaymentError::Invalid(_)));
    }

    let result = payments.process_payment(ids[0], 10.0, "  ", &PATIENT).await;
    assert_matches!(result, Err(PaymentError::Invalid(_)));
}

#[tokio::test]
async fn test_paying_twice_is_a_conflict() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    payments.process_payment(ids[0], 10.0, "card", &PATIENT).await.unwrap();
    let result = payments.process_payment(ids[0], 10.0, "card", &PATIENT).await;

    assert_matches!(result, Err(PaymentError::AlreadyPaid));
}

#[tokio::test]
async fn test_refund_requires_paid_status_and_leaves_state_untouched() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    let before = stored(&repository, ids[0]).await;
    let result = payments.refund_payment(ids[0], &DOCTOR).await;
    assert_matches!(result, Err(PaymentError::NotRefundable));

    let after = stored(&repository, ids[0]).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_refund_by_doctor_keeps_lifecycle_status() {
    let repository = Arc::new(MemoryRepository::new());
    let ids = insert_appointments(&repository, 1, PATIENT.id, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    payments.process_payment(ids[0], 50.0, "card", &PATIENT).await.unwrap();

    let outsider = Actor::new(3, Role::Doctor);
    assert_matches!(
        payments.refund_payment(ids[0], &outsider).await,
        Err(PaymentError::NotParticipant)
    );

    let refunded = payments.refund_payment(ids[0], &DOCTOR).await.unwrap();
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
    assert_eq!(refunded.payment_notes.as_deref(), Some("Payment refunded"));
    assert_eq!(refunded.status, AppointmentStatus::Approved);
    assert!(refunded.payment_reference.is_some());
}

#[tokio::test]
async fn test_history_and_unpaid_filter_by_patient() {
    let repository = Arc::new(MemoryRepository::new());
    let mine = insert_appointments(&repository, 3, PATIENT.id, DOCTOR.id).await;
    insert_appointments(&repository, 2, 5, DOCTOR.id).await;
    let payments = processor(repository.clone(), FixedGateway::approving());

    payments.process_payment(mine[0], 10.0, "card", &PATIENT).await.unwrap();

    assert_eq!(payments.paid_appointments(PATIENT.id).await.unwrap().len(), 1);
    assert_eq!(payments.unpaid_appointments(PATIENT.id).await.unwrap().len(), 2);
    assert_eq!(payments.unpaid_appointments(5).await.unwrap().len(), 2);
}

// HTTP surface

async fn call(app: Router, method: &str, uri: &str, bearer: String, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", bearer)
        .header("Content-Type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn app(clinic: &TestClinic, gateway: impl PaymentGateway + 'static) -> Router {
    Router::new().nest(
        "/api/payments",
        payment_routes(clinic.state.clone(), Arc::new(gateway)),
    )
}

async fn clinic_with_appointment() -> (TestClinic, i64) {
    let clinic = TestClinic::new().await;
    let ids = insert_appointments(&clinic.repository, 1, clinic.patient.id, clinic.doctor.id).await;
    (clinic, ids[0])
}

fn pay_body(id: i64) -> Value {
    json!({"appointment_id": id, "amount": 50.0, "payment_method": "card"})
}

#[tokio::test]
async fn test_process_endpoint_returns_receipt() {
    let (clinic, id) = clinic_with_appointment().await;

    let (status, body) = call(
        app(&clinic, FixedGateway::approving()),
        "POST",
        "/api/payments/process",
        clinic.bearer_for(&clinic.patient),
        Some(pay_body(id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["payment"]["payment_status"], "PAID");
}

#[tokio::test]
async fn test_process_endpoint_reports_decline_as_payment_error() {
    let (clinic, id) = clinic_with_appointment().await;

    let (status, body) = call(
        app(&clinic, FixedGateway::declining()),
        "POST",
        "/api/payments/process",
        clinic.bearer_for(&clinic.patient),
        Some(pay_body(id)),
    )
    .await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], "payment_error");
}

#[tokio::test]
async fn test_process_endpoint_rejects_doctor() {
    let (clinic, id) = clinic_with_appointment().await;
    let doctor: &TestUser = &clinic.doctor;

    let (status, _) = call(
        app(&clinic, FixedGateway::approving()),
        "POST",
        "/api/payments/process",
        clinic.bearer_for(doctor),
        Some(pay_body(id)),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_refund_endpoint_conflict_when_unpaid() {
    let (clinic, id) = clinic_with_appointment().await;

    let (status, body) = call(
        app(&clinic, FixedGateway::approving()),
        "POST",
        &format!("/api/payments/{}/refund", id),
        clinic.bearer_for(&clinic.doctor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict_error");
}

#[tokio::test]
async fn test_history_endpoint_lists_paid() {
    let (clinic, id) = clinic_with_appointment().await;
    let router = app(&clinic, FixedGateway::approving());

    call(
        router.clone(),
        "POST",
        "/api/payments/process",
        clinic.bearer_for(&clinic.patient),
        Some(pay_body(id)),
    )
    .await;

    let (status, body) = call(
        router,
        "GET",
        "/api/payments/history",
        clinic.bearer_for(&clinic.patient),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_malformed_body_uses_error_envelope() {
    let (clinic, id) = clinic_with_appointment().await;

    let (status, body) = call(
        app(&clinic, FixedGateway::approving()),
        "POST",
        "/api/payments/process",
        clinic.bearer_for(&clinic.patient),
        Some(json!({"appointment_id": id, "amount": "fifty"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert!(body["error"].as_str().is_some());
}
