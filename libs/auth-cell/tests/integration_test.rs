use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::{auth_routes, user_routes};
use shared_config::AppConfig;
use shared_utils::test_utils::{JwtTestUtils, TestClinic};

fn create_test_app(clinic: &TestClinic) -> Router {
    Router::new()
        .nest("/auth", auth_routes(clinic.state.clone()))
        .nest("/api/users", user_routes(clinic.state.clone()))
}

async fn send(app: Router, method: &str, uri: &str, authorization: Option<String>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }

    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_validate_token_endpoint() {
    let clinic = TestClinic::new().await;
    let bearer = clinic.bearer_for(&clinic.patient);

    let (status, body) = send(create_test_app(&clinic), "POST", "/auth/validate", Some(bearer)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["user_id"], clinic.patient.id.to_string());
    assert_eq!(body["role"], "patient");
}

#[tokio::test]
async fn test_validate_token_endpoint_unauthorized() {
    let clinic = TestClinic::new().await;

    let (status, body) = send(create_test_app(&clinic), "POST", "/auth/validate", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");
    assert_eq!(body["kind"], "authentication_error");

    let (status, body) = send(
        create_test_app(&clinic),
        "POST",
        "/auth/validate",
        Some("Basic dXNlcjpwYXNz".to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authorization header format");
}

#[tokio::test]
async fn test_verify_token_endpoint_with_malformed_token() {
    let clinic = TestClinic::new().await;
    let bearer = format!("Bearer {}", JwtTestUtils::create_malformed_token());

    let (status, body) = send(create_test_app(&clinic), "POST", "/auth/verify", Some(bearer)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false }));
}

#[tokio::test]
async fn test_profile_endpoint_requires_token() {
    let clinic = TestClinic::new().await;

    let (status, _) = send(create_test_app(&clinic), "GET", "/auth/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bearer = clinic.bearer_for(&clinic.doctor);
    let (status, body) = send(create_test_app(&clinic), "GET", "/auth/profile", Some(bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], clinic.doctor.id);
    assert_eq!(body["role"], "DOCTOR");
    assert_eq!(body["account"]["email"], clinic.doctor.email);
}

#[tokio::test]
async fn test_user_endpoint_enforces_visibility() {
    let clinic = TestClinic::new().await;
    let bearer = clinic.bearer_for(&clinic.patient);

    let uri = format!("/api/users/{}", clinic.other_patient.id);
    let (status, body) = send(create_test_app(&clinic), "GET", &uri, Some(bearer)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission_error");
}

#[tokio::test]
async fn test_user_endpoint_reads_supabase_directory() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 2,
            "first_name": "Remote",
            "last_name": "Doctor",
            "email": "remote.doctor@clinic.test",
            "role": "DOCTOR"
        }])))
        .mount(&mock_server)
        .await;

    let clinic = TestClinic::with_config(AppConfig {
        supabase_url: mock_server.uri(),
        supabase_anon_key: "anon".to_string(),
        ..AppConfig::default()
    })
    .await;
    let client = shared_database::supabase::SupabaseClient::new(&clinic.state.config).unwrap();
    let state = shared_utils::AppState::new(
        clinic.state.config.clone(),
        clinic.state.repository.clone(),
        std::sync::Arc::new(shared_database::SupabaseDirectory::new(client)),
    );

    let app = Router::new().nest("/api/users", user_routes(state));
    let (status, body) = send(app, "GET", "/api/users/2", Some(clinic.bearer_for(&clinic.admin))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Remote");
}
