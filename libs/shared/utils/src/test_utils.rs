use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use shared_config::AppConfig;
use shared_database::MemoryRepository;
use shared_models::auth::{Actor, Role, User};
use shared_models::user::UserAccount;
use shared_models::EntityId;

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: EntityId,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(id: EntityId, email: &str, role: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(id: EntityId, email: &str) -> Self {
        Self::new(id, email, "doctor")
    }

    pub fn patient(id: EntityId, email: &str) -> Self {
        Self::new(id, email, "patient")
    }

    pub fn admin(id: EntityId, email: &str) -> Self {
        Self::new(id, email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_actor(&self) -> Actor {
        let role = Role::parse(&self.role).unwrap_or(Role::Patient);
        Actor::new(self.id, role)
    }

    pub fn to_account(&self) -> UserAccount {
        let (first, last) = self.email.split_once('@').unwrap_or((&self.email, "user"));
        UserAccount {
            id: self.id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: self.email.clone(),
            role: Role::parse(&self.role).unwrap_or(Role::Patient),
            phone_number: None,
            address: None,
            created_at: Utc::now(),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// A clinic with one admin (id 1), two doctors (2, 3) and two patients (4, 5).
pub struct TestClinic {
    pub config: TestConfig,
    pub state: AppState,
    pub repository: Arc<MemoryRepository>,
    pub admin: TestUser,
    pub doctor: TestUser,
    pub other_doctor: TestUser,
    pub patient: TestUser,
    pub other_patient: TestUser,
}

impl TestClinic {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    /// Seeds the standard users into a fresh in-memory repository using `base`
    /// with the test JWT secret applied.
    pub async fn with_config(base: AppConfig) -> Self {
        let config = TestConfig::default();
        let app_config = AppConfig {
            supabase_jwt_secret: config.jwt_secret.clone(),
            ..base
        };

        let admin = TestUser::admin(1, "admin@clinic.test");
        let doctor = TestUser::doctor(2, "doctor@clinic.test");
        let other_doctor = TestUser::doctor(3, "other.doctor@clinic.test");
        let patient = TestUser::patient(4, "patient@clinic.test");
        let other_patient = TestUser::patient(5, "other.patient@clinic.test");

        let repository = Arc::new(MemoryRepository::new());
        repository
            .seed_users(vec![
                admin.to_account(),
                doctor.to_account(),
                other_doctor.to_account(),
                patient.to_account(),
                other_patient.to_account(),
            ])
            .await
            .expect("seeding test users");

        let state = AppState::in_memory(Arc::new(app_config), repository.clone());

        Self {
            config,
            state,
            repository,
            admin,
            doctor,
            other_doctor,
            patient,
            other_patient,
        }
    }

    pub fn token_for(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.config.jwt_secret, Some(1))
    }

    pub fn bearer_for(&self, user: &TestUser) -> String {
        format!("Bearer {}", self.token_for(user))
    }
}
