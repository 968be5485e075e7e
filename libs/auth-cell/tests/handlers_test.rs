use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::{Extension, Path, State};
use axum_extra::TypedHeader;
use headers::Authorization;
use mockall::mock;

use auth_cell::handlers::{get_profile, get_user, validate_token, verify_token};
use auth_cell::models::AuthError;
use auth_cell::AccountService;
use shared_database::UserDirectory;
use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_models::user::UserAccount;
use shared_models::EntityId;
use shared_utils::test_utils::{JwtTestUtils, TestClinic, TestUser};

mock! {
    pub Directory {}

    #[async_trait::async_trait]
    impl UserDirectory for Directory {
        async fn find_by_id(&self, id: EntityId) -> anyhow::Result<Option<UserAccount>>;
        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserAccount>>;
    }
}

fn bearer(token: &str) -> TypedHeader<Authorization<headers::authorization::Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

#[tokio::test]
async fn test_validate_token_returns_claims() {
    let clinic = TestClinic::new().await;
    let token = clinic.token_for(&clinic.doctor);

    let response = validate_token(State(clinic.state.clone()), Ok(bearer(&token)))
        .await
        .unwrap()
        .0;

    assert!(response.valid);
    assert_eq!(response.user_id, clinic.doctor.id.to_string());
    assert_eq!(response.email, Some(clinic.doctor.email.clone()));
    assert_eq!(response.role, Some(clinic.doctor.role.clone()));
}

#[tokio::test]
async fn test_validate_token_rejects_expired_token() {
    let clinic = TestClinic::new().await;
    let token = JwtTestUtils::create_expired_token(&clinic.patient, &clinic.config.jwt_secret);

    let result = validate_token(State(clinic.state.clone()), Ok(bearer(&token))).await;

    match result {
        Err(AppError::Auth(msg)) => assert_eq!(msg, "Token expired"),
        other => panic!("Expected Auth error, got {:?}", other.map(|r| r.0)),
    }
}

#[tokio::test]
async fn test_verify_token_reports_validity() {
    let clinic = TestClinic::new().await;

    let good = clinic.token_for(&clinic.patient);
    let response = verify_token(State(clinic.state.clone()), Ok(bearer(&good)))
        .await
        .unwrap();
    assert_eq!(response.0["valid"], true);

    let forged = JwtTestUtils::create_invalid_signature_token(&clinic.patient);
    let response = verify_token(State(clinic.state.clone()), Ok(bearer(&forged)))
        .await
        .unwrap();
    assert_eq!(response.0["valid"], false);
}

#[tokio::test]
async fn test_profile_includes_directory_account() {
    let clinic = TestClinic::new().await;

    let response = get_profile(
        State(clinic.state.clone()),
        Extension(clinic.patient.to_user()),
        Extension(clinic.patient.to_actor()),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(response.user_id, clinic.patient.id);
    assert_eq!(response.role, Role::Patient);
    let account = response.account.unwrap();
    assert_eq!(account.id, clinic.patient.id);
    assert_eq!(account.email, clinic.patient.email);
}

#[tokio::test]
async fn test_profile_without_directory_entry() {
    let clinic = TestClinic::new().await;
    let stranger = TestUser::patient(77, "stranger@clinic.test");

    let response = get_profile(
        State(clinic.state.clone()),
        Extension(stranger.to_user()),
        Extension(stranger.to_actor()),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(response.user_id, 77);
    assert!(response.account.is_none());
}

#[tokio::test]
async fn test_patients_see_themselves_and_doctors_only() {
    let clinic = TestClinic::new().await;
    let patient = clinic.patient.to_actor();

    let own = get_user(
        State(clinic.state.clone()),
        Path(clinic.patient.id),
        Extension(patient),
    )
    .await
    .unwrap();
    assert_eq!(own.0["email"], clinic.patient.email);

    let doctor = get_user(
        State(clinic.state.clone()),
        Path(clinic.doctor.id),
        Extension(patient),
    )
    .await
    .unwrap();
    assert_eq!(doctor.0["role"], "DOCTOR");

    let other = get_user(
        State(clinic.state.clone()),
        Path(clinic.other_patient.id),
        Extension(patient),
    )
    .await;
    assert_matches!(other, Err(AppError::Permission(_)));

    let by_doctor = get_user(
        State(clinic.state.clone()),
        Path(clinic.other_patient.id),
        Extension(clinic.doctor.to_actor()),
    )
    .await;
    tokio_test::assert_ok!(by_doctor);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let clinic = TestClinic::new().await;

    let result = get_user(
        State(clinic.state.clone()),
        Path(404),
        Extension(clinic.admin.to_actor()),
    )
    .await;

    match result {
        Err(AppError::NotFound(msg)) => assert_eq!(msg, "User 404 not found"),
        other => panic!("Expected NotFound, got {:?}", other.map(|r| r.0)),
    }
}

#[tokio::test]
async fn test_directory_failure_is_upstream_error() {
    let mut directory = MockDirectory::new();
    directory
        .expect_find_by_id()
        .returning(|_| Err(anyhow::anyhow!("connection refused")));

    let service = AccountService::new(Arc::new(directory));
    let result = service
        .get_user(2, &TestUser::admin(1, "admin@clinic.test").to_actor())
        .await;

    assert_matches!(result, Err(AuthError::Directory(msg)) if msg.contains("connection refused"));
    assert_matches!(
        AppError::from(AuthError::Directory("down".to_string())),
        AppError::ExternalService(_)
    );
}
