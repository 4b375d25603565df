use super::{
    error::AuthError,
    required,
    state::AuthState,
    types::{ErrorResponse, RegisterRequest, RegisterResponse},
};
use crate::store::{NewUser, StoreError};
use axum::{extract::Extension, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

const FIELDS_REQUIRED: &str = "All fields are required!";

#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = RegisterResponse, content_type = "application/json"),
        (status = 400, description = "Missing fields or the email is already registered", body = ErrorResponse),
        (status = 500, description = "Server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    // A body that is not JSON is handled like an empty one.
    let request = payload.map(|Json(request)| request).unwrap_or_default();

    debug!("register request: {:?}", request);

    let (Some(username), Some(email), Some(password)) = (
        required(request.username),
        required(request.email),
        required(request.password),
    ) else {
        return Err(AuthError::Validation(FIELDS_REQUIRED));
    };

    let store = auth_state.store();

    // Fast path only; the unique index below is what actually guards the email.
    match store.find_by_email(&email).await {
        Ok(Some(_)) => {
            debug!("User already exists");
            return Err(AuthError::Conflict);
        }
        Ok(None) => (),
        Err(err) => return Err(AuthError::internal("Error checking if user exists", &err)),
    }

    let password_hash = auth_state
        .passwords()
        .hash(&password)
        .await
        .map_err(|err| AuthError::internal("Error hashing password", &err))?;

    match store
        .insert(NewUser {
            username,
            email,
            password_hash,
        })
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, "User registered");

            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    success: true,
                    message: "User registered successfully!".to_string(),
                }),
            ))
        }
        Err(StoreError::Duplicate) => {
            debug!("User already exists (lost insert race)");
            Err(AuthError::Conflict)
        }
        Err(err) => Err(AuthError::internal("Error inserting user", &err)),
    }
}
