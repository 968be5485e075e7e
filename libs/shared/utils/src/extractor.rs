use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, FromRequest, State},
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
    Json,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{Actor, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// `Json<T>` whose rejections come back in the usual error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(request, state).await?;
        Ok(Self(value))
    }
}

/// Requires a valid bearer token. Inserts the decoded [`User`] and the
/// resolved [`Actor`] into the request extensions.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let (user, actor) = authenticate(&token, &config)?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

/// Lets anonymous requests through, but a token that is present must be valid.
pub async fn optional_auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    match bearer_token(&request)? {
        Some(token) => {
            let (user, actor) = authenticate(&token, &config)?;
            request.extensions_mut().insert(user);
            request.extensions_mut().insert(actor);
        }
        None => debug!("Anonymous request to {}", request.uri().path()),
    }

    Ok(next.run(request).await)
}

fn bearer_token<B>(request: &Request<B>) -> Result<Option<String>, AppError> {
    let Some(auth_header) = request.headers().get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    auth_value
        .strip_prefix("Bearer ")
        .map(|token| Some(token.trim().to_string()))
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))
}

fn authenticate(token: &str, config: &AppConfig) -> Result<(User, Actor), AppError> {
    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(|e| AppError::Auth(e.to_string()))?;
    let actor = Actor::from_user(&user)?;
    Ok((user, actor))
}
