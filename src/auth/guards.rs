use chrono::Utc;
use rocket::Request;
use rocket::State;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;
use uuid::Uuid;

use crate::auth::jwt::AccessTokenClaims;
use crate::auth::{AuthError, AuthResult, AuthState};
use crate::models::UserType;
use crate::store::SharedStore;

#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    /// `None` when the identity has no profile row.
    pub user_type: Option<UserType>,
    pub token_version: i32,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.user_type, Some(UserType::Admin))
    }
}

/// Account id of the authenticated caller, cached per request for logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestAccount(pub Option<Uuid>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match extract_user(request).await {
            Ok(user) => {
                request.local_cache(|| RequestAccount(Some(user.id)));
                Outcome::Success(user)
            }
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Guard for admin-only routes: authenticated and profile `user_type = admin`.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireAdmin(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if user.is_admin() {
                    Outcome::Success(RequireAdmin(user))
                } else {
                    log::debug!("account {} denied admin access", user.id);
                    Outcome::Error((AuthError::Forbidden.status(), AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((
                AuthError::Unauthorized.status(),
                AuthError::Unauthorized,
            )),
        }
    }
}

async fn extract_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let store = request
        .guard::<&State<SharedStore>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("store missing from state".into()))?;

    let claims = auth_state.jwt_service.decode_access_token(token)?;
    validate_claims(&claims)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;

    let account = store
        .find_account(user_id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    if account.disabled {
        return Err(AuthError::AccountDisabled);
    }

    if account.token_version != claims.token_version {
        return Err(AuthError::TokenInvalid);
    }

    Ok(AuthUser {
        id: account.id,
        email: account.email,
        full_name: account.full_name,
        user_type: account.user_type,
        token_version: account.token_version,
    })
}

fn bearer_token_from_request<'a>(request: &'a Request<'_>) -> AuthResult<&'a str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Ok(token)
    } else {
        Err(AuthError::Unauthorized)
    }
}

fn validate_claims(claims: &AccessTokenClaims) -> AuthResult<()> {
    let now = Utc::now().timestamp();
    if claims.exp < now {
        return Err(AuthError::TokenExpired);
    }
    Ok(())
}
