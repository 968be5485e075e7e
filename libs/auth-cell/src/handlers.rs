use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::{typed_header::TypedHeaderRejection, TypedHeader};
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::{Actor, TokenResponse, User};
use shared_models::error::AppError;
use shared_models::EntityId;
use shared_utils::jwt;
use shared_utils::AppState;

use crate::models::{AuthError, ProfileResponse};
use crate::services::accounts::AccountService;

type BearerHeader = Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>;

fn bearer_token(header: BearerHeader) -> Result<String, AuthError> {
    match header {
        Ok(TypedHeader(auth)) => Ok(auth.token().to_string()),
        Err(rejection) if rejection.is_missing() => Err(AuthError::MissingHeader),
        Err(_) => Err(AuthError::MalformedHeader),
    }
}

#[axum::debug_handler]
pub async fn validate_token(
    State(state): State<AppState>,
    header: BearerHeader,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(header)?;
    let user = jwt::validate_token(&token, &state.config.supabase_jwt_secret)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[axum::debug_handler]
pub async fn verify_token(
    State(state): State<AppState>,
    header: BearerHeader,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(header)?;
    let valid = jwt::validate_token(&token, &state.config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ProfileResponse>, AppError> {
    debug!("Getting profile for user: {}", actor.id);

    let account = AccountService::new(state.directory.clone())
        .own_account(&actor)
        .await?;

    Ok(Json(ProfileResponse {
        user_id: actor.id,
        email: user.email,
        role: actor.role,
        account,
    }))
}

#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<EntityId>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Value>, AppError> {
    let account = AccountService::new(state.directory.clone())
        .get_user(user_id, &actor)
        .await?;

    Ok(Json(json!(account)))
}
