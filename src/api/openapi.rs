#![allow(clippy::needless_for_each)]

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::{
    handlers::{chirps, health, login, tokens, users, webhooks, Credentials, User},
    response::ErrorBody,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        users::create_user,
        users::update_user,
        login::login,
        tokens::refresh,
        tokens::revoke,
        chirps::create_chirp,
        chirps::list_chirps,
        chirps::get_chirp,
        chirps::delete_chirp,
        webhooks::polka_webhook,
    ),
    components(
        schemas(
            health::Health,
            Credentials,
            User,
            login::LoginResponse,
            tokens::AccessToken,
            chirps::Chirp,
            chirps::ChirpRequest,
            chirps::SortOrder,
            webhooks::PolkaEvent,
            webhooks::WebhookData,
            ErrorBody,
        )
    ),
    modifiers(&SecuritySchemes),
    tags(
        (name = "chirpy", description = "Chirpy API"),
        (name = "auth", description = "Login, token refresh and revocation"),
    )
)]
struct ApiDoc;

struct SecuritySchemes;

impl Modify for SecuritySchemes {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        // `Authorization: ApiKey <key>`
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("Authorization"))),
        );
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
