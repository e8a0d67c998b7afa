//! HTTP Routes for Authentication
//!
//! - POST /auth/register - Create an account (admin token needed for admins)
//! - POST /auth/login    - Exchange username and password for a token
//! - GET  /auth/verify   - Role of the account behind a token
//! - POST /auth/refresh  - Re-issue a still-valid token

use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use super::{json_response, method_not_allowed, ApiRequest, BoxBody};
use crate::auth::{extract_bearer_token, Role};
use crate::server::AppState;
use crate::services::{LoginRequest, RegisterRequest};
use crate::types::{NotewardenError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub role: Role,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: u64,
}

/// POST /auth/register
///
/// A missing Authorization header is fine; a bad one is rejected.
async fn handle_register(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let caller = state.guard.authenticate_optional(req.auth())?;
    let body: RegisterRequest = req.json()?;

    let account = state.accounts.register(caller.as_ref(), body).await?;
    Ok(json_response(
        StatusCode::CREATED,
        &RegisterResponse {
            message: "User registered successfully",
            user_id: account.id,
            role: account.role,
        },
    ))
}

/// POST /auth/login
async fn handle_login(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let body: LoginRequest = req.json()?;
    let login = state.accounts.login(body).await?;
    Ok(json_response(StatusCode::OK, &login))
}

/// GET /auth/verify
async fn handle_verify(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let claims = state.guard.authenticate(req.auth())?;
    let account = state.accounts.verify(&claims).await?;
    Ok(json_response(
        StatusCode::OK,
        &VerifyResponse {
            role: account.role,
            user_id: account.id,
            username: account.username,
        },
    ))
}

/// POST /auth/refresh
async fn handle_refresh(state: &AppState, req: &ApiRequest) -> Result<Response<BoxBody>> {
    let token = extract_bearer_token(req.auth())
        .ok_or_else(|| NotewardenError::Unauthenticated("No token provided".into()))?;
    let issued = state.accounts.refresh(token)?;
    debug!("Token refreshed");
    Ok(json_response(
        StatusCode::OK,
        &RefreshResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        },
    ))
}

/// Handle `/auth/*`; `None` for any other path
pub async fn handle_auth_request(
    state: &AppState,
    req: &ApiRequest,
) -> Option<Result<Response<BoxBody>>> {
    let segments = req.segments();
    if segments.first() != Some(&"auth") {
        return None;
    }

    let result = match (&req.method, segments.as_slice()) {
        (&Method::POST, ["auth", "register"]) => handle_register(state, req).await,
        (&Method::POST, ["auth", "login"]) => handle_login(state, req).await,
        (&Method::GET, ["auth", "verify"]) => handle_verify(state, req).await,
        (&Method::POST, ["auth", "refresh"]) => handle_refresh(state, req).await,

        (_, ["auth", "register" | "login" | "verify" | "refresh"]) => Ok(method_not_allowed()),

        _ => return None,
    };

    Some(result)
}
