use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    config::AppConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, UserList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
    status::{AccountStatus, UserRole},
};

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    full_name: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Roles a user may pick for themselves at sign-up.
pub fn registration_role(requested: Option<&str>) -> AppResult<UserRole> {
    let role = match requested.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => raw.parse::<UserRole>()?,
        None => UserRole::Consumer,
    };
    if role == UserRole::Admin {
        return Err(AppError::BadRequest("Cannot self-register as ADMIN".into()));
    }
    Ok(role)
}

pub fn issue_token(config: &AppConfig, user_id: Uuid, role: UserRole) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let role = registration_role(payload.role.as_deref())?;
    let email = payload.email.trim().to_lowercase();

    let exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exist.is_some() {
        return Err(AppError::invalid_state("Email is already taken"));
    }

    let password_hash = hash_password(&payload.password)?;

    let row: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, role, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, email, password_hash, full_name, role, status, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email.as_str())
    .bind(password_hash)
    .bind(payload.full_name.trim())
    .bind(role.as_str())
    .bind(AccountStatus::Active.as_str())
    .fetch_one(&state.pool)
    .await?;

    let user = User::from(row);
    tracing::info!(user_id = %user.id, role = %role, "user registered");
    audit::record(
        &state.pool,
        user.id,
        AuditAction::UserRegister,
        serde_json::json!({ "user_id": user.id, "role": role.as_str() }),
    )
    .await;

    Ok(ApiResponse::success("User created", user, None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let email = payload.email.trim().to_lowercase();
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        SELECT id, email, password_hash, full_name, role, status, created_at
        FROM users WHERE email = $1
        "#,
    )
    .bind(email.as_str())
    .fetch_optional(&state.pool)
    .await?;

    let row = row.ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;
    if !verify_password(&payload.password, &row.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let status: AccountStatus = row.status.parse()?;
    if status == AccountStatus::Inactive {
        return Err(AppError::Unauthorized("Account is inactive".into()));
    }

    let role: UserRole = row.role.parse()?;
    let token = issue_token(&state.config, row.id, role)?;
    let user = User::from(row);

    audit::record(
        &state.pool,
        user.id,
        AuditAction::UserLogin,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse { token, role, user },
        Some(Meta::empty()),
    ))
}

fn user_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("User not found with id: {id}"))
}

/// Admins manage other accounts only, so nobody can lock out or demote themselves.
pub fn ensure_other_account(admin: &AuthUser, target: Uuid) -> AppResult<()> {
    if admin.user_id == target {
        return Err(AppError::invalid_state(
            "Admins cannot change their own status or role",
        ));
    }
    Ok(())
}

pub async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        SELECT id, email, password_hash, full_name, role, status, created_at
        FROM users WHERE id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_optional(&state.pool)
    .await?;

    let row = row.ok_or_else(|| user_not_found(user.user_id))?;
    Ok(ApiResponse::success("Current user", User::from(row), None))
}

pub async fn list_users(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;

    let rows: Vec<UserRow> = sqlx::query_as(
        r#"
        SELECT id, email, password_hash, full_name, role, status, created_at
        FROM users ORDER BY created_at, email
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<User> = rows.into_iter().map(User::from).collect();
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn update_user_status(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    status: AccountStatus,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(admin)?;
    ensure_other_account(admin, id)?;

    let row: Option<UserRow> = sqlx::query_as(
        r#"
        UPDATE users SET status = $2 WHERE id = $1
        RETURNING id, email, password_hash, full_name, role, status, created_at
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.pool)
    .await?;
    let user = User::from(row.ok_or_else(|| user_not_found(id))?);

    tracing::info!(user_id = %id, status = status.as_str(), "user status changed");
    audit::record(
        &state.pool,
        admin.user_id,
        AuditAction::UserStatusChange,
        serde_json::json!({ "user_id": id, "status": status.as_str() }),
    )
    .await;

    Ok(ApiResponse::success("User status changed", user, Some(Meta::empty())))
}

pub async fn update_user_role(
    state: &AppState,
    admin: &AuthUser,
    id: Uuid,
    role: UserRole,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(admin)?;
    ensure_other_account(admin, id)?;

    let row: Option<UserRow> = sqlx::query_as(
        r#"
        UPDATE users SET role = $2 WHERE id = $1
        RETURNING id, email, password_hash, full_name, role, status, created_at
        "#,
    )
    .bind(id)
    .bind(role.as_str())
    .fetch_optional(&state.pool)
    .await?;
    let user = User::from(row.ok_or_else(|| user_not_found(id))?);

    tracing::info!(user_id = %id, role = %role, "user role changed");
    audit::record(
        &state.pool,
        admin.user_id,
        AuditAction::UserRoleChange,
        serde_json::json!({ "user_id": id, "role": role.as_str() }),
    )
    .await;

    Ok(ApiResponse::success("User role changed", user, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/unused".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            db_max_connections: 1,
        }
    }

    #[test]
    fn registration_defaults_to_consumer_and_refuses_admin() {
        assert_eq!(registration_role(None).unwrap(), UserRole::Consumer);
        assert_eq!(registration_role(Some("seller")).unwrap(), UserRole::Seller);
        assert!(matches!(
            registration_role(Some("ADMIN")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            registration_role(Some("wizard")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn issued_token_carries_subject_and_role() {
        let config = config();
        let user_id = Uuid::new_v4();
        let token = issue_token(&config, user_id, UserRole::Seller).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id.to_string());
        assert_eq!(decoded.claims.role, "SELLER");
    }

    #[test]
    fn admins_cannot_change_their_own_account() {
        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        };
        assert!(matches!(
            ensure_other_account(&admin, admin.user_id),
            Err(AppError::InvalidState(_))
        ));
        assert!(ensure_other_account(&admin, Uuid::new_v4()).is_ok());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("s3cret!").unwrap();
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
