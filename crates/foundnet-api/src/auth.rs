use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};

use foundnet_db::Database;
use foundnet_gateway::Dispatcher;
use foundnet_types::api::{
    Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserRole,
};

use crate::error::{ApiError, blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
}

/// Field checks for a registration payload. Returns the parsed role.
fn validate_registration(req: &RegisterRequest) -> Result<UserRole, ApiError> {
    let role = UserRole::parse(&req.role)
        .ok_or_else(|| ApiError::bad_request("role must be 'founder' or 'investor'"))?;
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }
    if req.email.is_empty() || !req.email.contains('@') {
        return Err(ApiError::bad_request("invalid email"));
    }
    if req.name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    Ok(role)
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let role = validate_registration(&req)?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();

    let db = state.clone();
    let name = req.name.clone();
    let user_id = blocking(move || {
        if db.db.get_user_by_email(&req.email)?.is_some() {
            return Err(ApiError::conflict("email already registered"));
        }
        let id = db.db.create_user(
            &req.email,
            &password_hash,
            &req.name,
            role.as_str(),
            req.bio.as_deref(),
        )?;
        Ok(id)
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, &name)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(LoginRequest { email, password }) =
        body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let db = state.clone();
    let user = blocking(move || Ok(db.db.get_user_by_email(&email)?))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {e}", user.id))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let role = UserRole::parse(&user.role)
        .ok_or_else(|| anyhow::anyhow!("corrupt role '{}' for user {}", user.role, user.id))?;

    let token = create_token(&state.jwt_secret, user.id, &user.name)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        name: user.name,
        role,
        token,
    }))
}

fn create_token(secret: &str, user_id: i64, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
