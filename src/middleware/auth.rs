use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState, status::UserRole};

/// Verified caller identity. Every service operation receives it explicitly.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub fn ensure_any_role(user: &AuthUser, roles: &[UserRole]) -> Result<(), AppError> {
    if !roles.contains(&user.role) {
        return Err(AppError::access_denied("Insufficient role for this operation"));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_any_role(user, &[UserRole::Admin])
}

pub fn ensure_seller_or_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_any_role(user, &[UserRole::Seller, UserRole::Admin])
}

pub fn ensure_consumer_or_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_any_role(user, &[UserRole::Consumer, UserRole::Admin])
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
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
        let role = decoded
            .claims
            .role
            .parse::<UserRole>()
            .map_err(|_| AppError::Unauthorized("Invalid role in token".into()))?;

        Ok(AuthUser { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn role_gates() {
        assert!(ensure_admin(&user(UserRole::Admin)).is_ok());
        assert!(matches!(
            ensure_admin(&user(UserRole::Seller)),
            Err(AppError::AccessDenied(_))
        ));
        assert!(ensure_seller_or_admin(&user(UserRole::Seller)).is_ok());
        assert!(ensure_seller_or_admin(&user(UserRole::Consumer)).is_err());
        assert!(ensure_consumer_or_admin(&user(UserRole::Consumer)).is_ok());
        assert!(ensure_consumer_or_admin(&user(UserRole::Seller)).is_err());
    }
}
