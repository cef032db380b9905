use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::{
    error::AppError,
    repository,
    response::{ApiResponse, FormNotice},
    session::{self, SESSION_COOKIE, token},
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl AuthUser {
    /// Cross-user access to per-user views is refused.
    pub fn ensure_self(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.user_id != user_id {
            return Err(AppError::forbidden());
        }
        Ok(())
    }
}

/// API callers get JSON; browsers get redirects.
pub fn wants_json(headers: &HeaderMap) -> bool {
    headers.contains_key(header::AUTHORIZATION)
        || headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|accept| accept.contains("application/json"))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

pub enum AuthRejection {
    /// No usable identity. `jar` carries the removal of a stale session cookie.
    Unauthenticated { wants_json: bool, jar: CookieJar },
    Failure(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated { wants_json: true, jar } => (
                StatusCode::UNAUTHORIZED,
                jar,
                Json(ApiResponse::<FormNotice>::rendered_error("Unauthenticated")),
            )
                .into_response(),
            AuthRejection::Unauthenticated { wants_json: false, jar } => {
                (jar, Redirect::to("/login")).into_response()
            }
            AuthRejection::Failure(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let wants_json = wants_json(&parts.headers);
        let jar = CookieJar::from_headers(&parts.headers);

        let from_cookie = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
        let Some(raw) = bearer_token(&parts.headers).or(from_cookie) else {
            return Err(AuthRejection::Unauthenticated { wants_json, jar });
        };

        let stale = |jar: CookieJar| AuthRejection::Unauthenticated {
            wants_json,
            jar: jar.remove(session::removal(SESSION_COOKIE)),
        };

        let user_id = match token::verify(&raw, &state.config.session_secret) {
            Ok(id) => id,
            Err(_) => return Err(stale(jar)),
        };

        let user = repository::users::find_by_id(&state.orm, user_id)
            .await
            .map_err(|e| AuthRejection::Failure(e.into()))?;

        match user {
            Some(user) => Ok(AuthUser {
                user_id: user.id,
                email: user.email,
            }),
            None => {
                tracing::debug!(%user_id, "session refers to a missing user");
                Err(stale(jar))
            }
        }
    }
}

/// Identity when present; pages that work for guests use this.
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AuthRejection::Unauthenticated { .. }) => Ok(MaybeUser(None)),
            Err(AuthRejection::Failure(err)) => Err(err),
        }
    }
}
