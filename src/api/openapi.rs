#![allow(clippy::needless_for_each)]

use super::handlers::{auth, health, root};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        root::root,
        health::health,
        auth::register::register,
        auth::login::login
    ),
    components(schemas(
        root::Root,
        health::Health,
        auth::types::RegisterRequest,
        auth::types::RegisterResponse,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::ErrorResponse
    )),
    tags(
        (name = "passgate", description = "Username/password authentication API"),
        (name = "auth", description = "Registration and login"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = openapi();
        for path in ["/", "/health", "/api/v1/register", "/api/v1/login"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
