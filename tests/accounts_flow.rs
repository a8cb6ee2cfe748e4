mod common;

use common::{create_user, setup_state};
use ecobazaarx_api::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppError,
    middleware::auth::AuthUser,
    services::auth_service,
    status::{AccountStatus, UserRole},
};
use uuid::Uuid;

const PASSWORD: &str = "compost-42";

fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.into(),
        full_name: "Robin Green".into(),
        role: None,
    }
}

fn credentials(email: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: PASSWORD.into(),
    }
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, UserRole::Admin).await?;
    let email = format!("robin-{}@example.com", Uuid::new_v4());

    let user = auth_service::register_user(&state, registration(&email))
        .await?
        .data
        .expect("user");
    assert_eq!(user.role, "CONSUMER");
    assert_eq!(user.status, "ACTIVE");

    let session = auth_service::login_user(&state, credentials(&email))
        .await?
        .data
        .expect("session");
    assert_eq!(session.user.id, user.id);

    let deactivated = auth_service::update_user_status(&state, &admin, user.id, AccountStatus::Inactive)
        .await?
        .data
        .expect("user");
    assert_eq!(deactivated.status, "INACTIVE");

    let refused = auth_service::login_user(&state, credentials(&email)).await;
    assert!(matches!(refused, Err(AppError::Unauthorized(_))));

    auth_service::update_user_status(&state, &admin, user.id, AccountStatus::Active).await?;
    auth_service::login_user(&state, credentials(&email)).await?;

    Ok(())
}

#[tokio::test]
async fn current_user_returns_own_profile() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let consumer = create_user(&state, UserRole::Consumer).await?;

    let me = auth_service::current_user(&state, &consumer).await?.data.expect("user");
    assert_eq!(me.id, consumer.user_id);
    assert_eq!(me.role, "CONSUMER");

    let ghost = AuthUser {
        user_id: Uuid::new_v4(),
        role: UserRole::Consumer,
    };
    let missing = auth_service::current_user(&state, &ghost).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn only_admins_list_and_manage_users() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let admin = create_user(&state, UserRole::Admin).await?;
    let consumer = create_user(&state, UserRole::Consumer).await?;

    let denied = auth_service::list_users(&state, &consumer).await;
    assert!(matches!(denied, Err(AppError::AccessDenied(_))));

    let listed = auth_service::list_users(&state, &admin).await?.data.expect("users");
    assert!(listed.items.iter().any(|u| u.id == consumer.user_id));

    let promoted = auth_service::update_user_role(&state, &admin, consumer.user_id, UserRole::Seller)
        .await?
        .data
        .expect("user");
    assert_eq!(promoted.role, "SELLER");

    let by_consumer =
        auth_service::update_user_role(&state, &consumer, admin.user_id, UserRole::Consumer).await;
    assert!(matches!(by_consumer, Err(AppError::AccessDenied(_))));

    let own_status =
        auth_service::update_user_status(&state, &admin, admin.user_id, AccountStatus::Inactive)
            .await;
    assert!(matches!(own_status, Err(AppError::InvalidState(_))));

    let unknown =
        auth_service::update_user_role(&state, &admin, Uuid::new_v4(), UserRole::Seller).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    Ok(())
}
