use super::{
    error::AuthError,
    required,
    session::session_cookie,
    state::AuthState,
    types::{ErrorResponse, LoginRequest, LoginResponse},
};
use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const FIELDS_REQUIRED: &str = "Email and password are required!";

#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, token also set as the `token` cookie", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Missing email or password", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponse>), AuthError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    debug!("login request: {:?}", request);

    let (Some(email), Some(password)) = (required(request.email), required(request.password))
    else {
        return Err(AuthError::Validation(FIELDS_REQUIRED));
    };

    let user = auth_state
        .store()
        .find_by_email(&email)
        .await
        .map_err(|err| AuthError::internal("Error looking up user", &err))?;

    let Some(user) = user else {
        // Pay for a bcrypt round anyway so timing matches the wrong-password path.
        auth_state.passwords().verify_dummy(&password).await;
        debug!("Unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !auth_state
        .passwords()
        .verify(&password, &user.password_hash)
        .await
    {
        debug!(user_id = %user.id, "Wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = auth_state
        .tokens()
        .issue(&user.email, user.role)
        .map_err(|err| AuthError::internal("Error signing token", &err))?;

    let cookie = session_cookie(auth_state.config(), auth_state.tokens().ttl(), &token)
        .map_err(|err| AuthError::internal("Error building session cookie", &err))?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    info!(user_id = %user.id, "Login successful");

    Ok((
        StatusCode::OK,
        headers,
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            access_token: token,
        }),
    ))
}
