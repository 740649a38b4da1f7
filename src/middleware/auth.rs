use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

pub fn is_valid_role(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_SUPER_ADMIN
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

/// Any authenticated admin account.
pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if is_valid_role(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// User management is restricted to super admins.
pub fn ensure_super_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.role == ROLE_SUPER_ADMIN {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;

        if !auth_str.starts_with("Bearer ") {
            return Err(AppError::Unauthorized);
        }
        let token = auth_str.trim_start_matches("Bearer ").trim();

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized)?;

        let user_id =
            Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;

        Ok(AuthUser {
            user_id,
            email: decoded.claims.email.clone(),
            role: decoded.claims.role.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            role: role.into(),
        }
    }

    #[test]
    fn both_roles_pass_admin_guard() {
        assert!(ensure_admin(&user(ROLE_ADMIN)).is_ok());
        assert!(ensure_admin(&user(ROLE_SUPER_ADMIN)).is_ok());
        assert!(ensure_admin(&user("viewer")).is_err());
    }

    #[test]
    fn only_super_admin_passes_super_guard() {
        assert!(ensure_super_admin(&user(ROLE_SUPER_ADMIN)).is_ok());
        assert!(matches!(
            ensure_super_admin(&user(ROLE_ADMIN)),
            Err(AppError::Forbidden)
        ));
    }
}
