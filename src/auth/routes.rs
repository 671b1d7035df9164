use rocket::serde::json::{self, Json};
use rocket::{State, get, post};
use rocket_okapi::openapi;

use crate::auth::guards::AuthUser;
use crate::auth::responses::{LoginRequest, LoginResponse, UserSummary};
use crate::auth::{AuthError, AuthState};
use crate::error::ApiError;
use crate::store::SharedStore;

/// Exchange email and password for a bearer access token.
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<payload>")]
pub async fn login(
    state: &State<AuthState>,
    store: &State<SharedStore>,
    payload: Result<Json<LoginRequest>, json::Error<'_>>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|err| ApiError::BadRequest(format!("malformed request body: {err}")))?;
    let email = request.email.trim().to_lowercase();
    let password = request.password.trim();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let passwords = &state.password_service;
    let account = match store.find_account_by_email(&email).await? {
        Some(account) => account,
        None => {
            passwords.reject_unknown(password)?;
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let verified = match account.password_hash.as_deref() {
        Some(hash) => passwords.verify_password(password, hash)?,
        None => passwords.reject_unknown(password)?,
    };
    if !verified {
        log::debug!("failed login for account {}", account.id);
        return Err(AuthError::InvalidCredentials.into());
    }

    if account.disabled {
        return Err(AuthError::AccountDisabled.into());
    }

    let signed = state.jwt_service.issue_access_token(
        account.id,
        &account.email,
        account.token_version,
    )?;
    log::info!("account {} logged in", account.id);

    Ok(Json(LoginResponse {
        access_token: signed.token,
        access_token_expires_at: signed.expires_at,
        user: UserSummary::from(&account),
    }))
}

/// The account behind the presented bearer token.
#[openapi(tag = "Auth")]
#[get("/auth/me")]
pub async fn me(user: Result<AuthUser, AuthError>) -> Result<Json<UserSummary>, ApiError> {
    Ok(Json(UserSummary::from(user?)))
}
