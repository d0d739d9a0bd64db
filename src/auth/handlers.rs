use axum::{
    body::Bytes,
    extract::{FromRef, State},
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        cookie::{clear_session_cookie, extract_token, session_cookie},
        dto::{
            Credentials, LoginRequest, MessageResponse, RegisterRequest, Registration,
            ThemeRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo_types::{NewUser, StoreError},
    },
    error::ApiError,
    state::AppState,
};

const WRONG_CREDENTIALS: &str = "Wrong email or password";
const EMAIL_TAKEN: &str = "An account with this email already exists";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(register))
        .route("/auth/", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", get(logout))
        .route("/auth/loggedIn", get(logged_in))
        .route("/auth/theme", get(get_theme).put(set_theme))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// An empty body, or one sent without a JSON content type, counts as `{}`;
/// a JSON body that does not parse is rejected.
fn body_or_default<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, ApiError> {
    if body.is_empty() || !is_json(headers) {
        return Ok(T::default());
    }
    match Json::<T>::from_bytes(body) {
        Ok(Json(payload)) => Ok(payload),
        Err(e) => {
            warn!(error = %e, "unreadable request body");
            Err(ApiError::Validation("Invalid request body"))
        }
    }
}

fn issue_session_cookie(keys: &JwtKeys, user_id: Uuid) -> anyhow::Result<HeaderValue> {
    let token = keys.sign(user_id)?;
    Ok(session_cookie(&token)?)
}

#[instrument(skip(state, headers, body))]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    const FAILED: ApiError = ApiError::Internal("Issue while registering");

    let Registration { email, password } = body_or_default::<RegisterRequest>(&headers, &body)?
        .validate()
        .map_err(|e| {
            warn!(reason = %e, "registration rejected");
            e
        })?;

    match state.users.find_by_email(&email).await {
        Ok(None) => {}
        Ok(Some(_)) => {
            warn!(email = %email, "email already registered");
            return Err(ApiError::Conflict(EMAIL_TAKEN));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(FAILED);
        }
    }

    let hash = match hash_password_blocking(password).await {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(FAILED);
        }
    };

    let new_user = NewUser {
        email: &email,
        password_hash: &hash,
    };
    let user = match state.users.create(new_user).await {
        Ok(u) => u,
        Err(StoreError::DuplicateEmail) => {
            warn!(email = %email, "email registered concurrently");
            return Err(ApiError::Conflict(EMAIL_TAKEN));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(FAILED);
        }
    };

    let cookie = issue_session_cookie(&JwtKeys::from_ref(&state), user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "issuing session cookie failed");
        FAILED
    })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            msg: "Registration successful",
        }),
    ))
}

#[instrument(skip(state, headers, body))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    const FAILED: ApiError = ApiError::Internal("Error occurred while signing in");

    let Credentials { email, password } =
        body_or_default::<LoginRequest>(&headers, &body)?.validate()?;

    let user = match state.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Auth(WRONG_CREDENTIALS));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(FAILED);
        }
    };

    let ok = match verify_password_blocking(password, user.password_hash.clone()).await {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "verify_password failed");
            return Err(FAILED);
        }
    };

    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Auth(WRONG_CREDENTIALS));
    }

    let cookie = issue_session_cookie(&JwtKeys::from_ref(&state), user.id).map_err(|e| {
        error!(error = %e, user_id = %user.id, "issuing session cookie failed");
        FAILED
    })?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            msg: "Login successful",
        }),
    ))
}

#[instrument]
pub async fn logout() -> Result<impl IntoResponse, ApiError> {
    let cookie = clear_session_cookie().map_err(|e| {
        error!(error = %e, "building logout cookie failed");
        ApiError::Internal("Problem while logging out")
    })?;

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageResponse {
            msg: "Logout successful",
        }),
    ))
}

/// Liveness probe for the session cookie; always answers 200.
#[instrument(skip(keys, headers))]
pub async fn logged_in(State(keys): State<JwtKeys>, headers: HeaderMap) -> Json<bool> {
    let Some(token) = extract_token(&headers) else {
        return Json(false);
    };
    match keys.verify(&token) {
        Ok(_) => Json(true),
        Err(e) => {
            debug!(error = %e, "session token rejected");
            Json(false)
        }
    }
}

/// Failures answer 200 with an empty body instead of an error object.
#[instrument(skip(state))]
pub async fn get_theme(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> Response {
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => Json(user.theme_or_default().to_string()).into_response(),
        Ok(None) => {
            warn!(user_id = %user_id, "theme requested for unknown user");
            StatusCode::OK.into_response()
        }
        Err(e) => {
            error!(error = %e, user_id = %user_id, "theme lookup failed");
            StatusCode::OK.into_response()
        }
    }
}

#[instrument(skip(state, headers, body))]
pub async fn set_theme(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let theme = body_or_default::<ThemeRequest>(&headers, &body)?.theme();

    match state.users.set_theme(user_id, &theme).await {
        Ok(true) => info!(user_id = %user_id, theme = %theme, "theme updated"),
        Ok(false) => warn!(user_id = %user_id, "theme update matched no user"),
        Err(e) => {
            error!(error = %e, user_id = %user_id, "set_theme failed");
            return Err(ApiError::Internal("Problem while updating theme"));
        }
    }

    Ok(Json(MessageResponse {
        msg: "Theme changed successfully",
    }))
}
