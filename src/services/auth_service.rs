use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use validator::Validate;

use crate::{
    audit,
    dto::auth::{LoginForm, PasswordResetForm, RegisterForm},
    entity::users::Model as UserModel,
    error::{AppError, AppResult},
    repository::{self, is_unique_violation},
    session::token,
    state::AppState,
};

/// Plaintext passwords above this many bytes are refused before hashing.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub fn hash_password(password: &str) -> AppResult<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation("Password too long".into()));
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_session(state: &AppState, user: &UserModel) -> AppResult<String> {
    token::issue(
        user.id,
        &state.config.session_secret,
        state.config.session_ttl_hours,
    )
}

pub async fn register_user(state: &AppState, payload: RegisterForm) -> AppResult<UserModel> {
    payload.validate()?;
    let RegisterForm { email, password } = payload;
    let email = email.trim().to_lowercase();

    if repository::users::find_by_email(&state.orm, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("User exists please login".into()));
    }

    let password_hash = hash_password(&password)?;
    let user = match repository::users::insert(&state.orm, &email, password_hash).await {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict("User exists please login".into()));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        &state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    Ok(user)
}

pub async fn login_user(state: &AppState, payload: LoginForm) -> AppResult<UserModel> {
    payload.validate()?;
    let LoginForm { email, password } = payload;
    let email = email.trim().to_lowercase();

    let user = repository::users::find_by_email(&state.orm, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Email not found please register".into()))?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Validation("Password does not match".into()));
    }

    audit::record(
        &state.orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    Ok(user)
}

/// Replaces the password hash. The account's id and email never change.
pub async fn reset_password(state: &AppState, payload: PasswordResetForm) -> AppResult<()> {
    payload.validate()?;
    let PasswordResetForm { email, password } = payload;
    let email = email.trim().to_lowercase();

    let user = repository::users::find_by_email(&state.orm, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("Email not found".into()))?;

    if verify_password(&password, &user.password_hash)? {
        return Err(AppError::Validation(
            "New and old password is same either login or use different password".into(),
        ));
    }

    let password_hash = hash_password(&password)?;
    let user = repository::users::replace_password_hash(&state.orm, user, password_hash).await?;

    tracing::info!(user_id = %user.id, "password reset");
    audit::record(
        &state.orm,
        Some(user.id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    Ok(())
}
