use std::collections::HashSet;

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};

use foundnet_types::api::{
    Claims, ConnectionsResponse, SearchQuery, SearchResponse, UpdateProfileRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::views;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let profile = blocking(move || {
        let user = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        Ok(views::user_profile(&db.db, &user)?)
    })
    .await?;

    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let password_hash = match req.password.as_deref() {
        Some(password) if password.len() < 8 => {
            return Err(ApiError::bad_request("password must be at least 8 characters"));
        }
        Some(password) => {
            let salt = SaltString::generate(&mut OsRng);
            Some(
                Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
                    .to_string(),
            )
        }
        None => None,
    };

    let db = state.clone();
    let profile = blocking(move || {
        db.db.update_user_profile(
            claims.sub,
            req.name.as_deref(),
            req.bio.as_deref(),
            password_hash.as_deref(),
        )?;
        let user = db
            .db
            .get_user_by_id(claims.sub)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        Ok(views::user_profile(&db.db, &user)?)
    })
    .await?;

    Ok(Json(profile))
}

const SEARCH_LIMIT: u32 = 20;

pub async fn search_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let users = blocking(move || {
        let rows = db.db.search_users(
            claims.sub,
            query.q.as_deref(),
            query.role.as_deref(),
            query.industry.as_deref(),
            SEARCH_LIMIT,
        )?;
        let users = rows
            .iter()
            .map(|row| views::public_user(&db.db, row))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(users)
    })
    .await?;

    Ok(Json(SearchResponse { users }))
}

/// The counterpart user of every match the caller participates in.
pub async fn get_connections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let connections = blocking(move || {
        let matches = db.db.matches_for_user(claims.sub)?;

        let mut seen = HashSet::new();
        let mut connections = Vec::new();
        for m in matches {
            let other_id = if m.founder_id == claims.sub {
                m.investor_id
            } else {
                m.founder_id
            };
            if !seen.insert(other_id) {
                continue;
            }
            if let Some(row) = db.db.get_user_by_id(other_id)? {
                connections.push(views::public_user(&db.db, &row)?);
            }
        }
        Ok(connections)
    })
    .await?;

    Ok(Json(ConnectionsResponse { connections }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = blocking(move || {
        let row = db
            .db
            .get_user_by_id(user_id)?
            .ok_or_else(|| ApiError::not_found("user not found"))?;
        Ok(views::public_user(&db.db, &row)?)
    })
    .await?;

    Ok(Json(user))
}
