use serde::Serialize;
use thiserror::Error;

use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_models::user::UserAccount;
use shared_models::EntityId;

/// Body of `/auth/profile`: the token's identity plus the directory
/// account it resolves to, when there is one.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: EntityId,
    pub email: Option<String>,
    pub role: Role,
    pub account: Option<UserAccount>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    MalformedHeader,

    #[error("{0}")]
    InvalidToken(String),

    #[error("User {0} not found")]
    UserNotFound(EntityId),

    #[error("Patients can only view their own account or a doctor's")]
    Forbidden,

    #[error("User directory unavailable: {0}")]
    Directory(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingHeader | AuthError::MalformedHeader | AuthError::InvalidToken(_) => {
                AppError::Auth(err.to_string())
            }
            AuthError::UserNotFound(_) => AppError::NotFound(err.to_string()),
            AuthError::Forbidden => AppError::Permission(err.to_string()),
            AuthError::Directory(_) => AppError::ExternalService(err.to_string()),
        }
    }
}
