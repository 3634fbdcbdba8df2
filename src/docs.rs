// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,

        // --- Auth ---
        handlers::auth::get_me,

        // --- Session ---
        handlers::session::get_session_context,

        // --- Subscriptions ---
        handlers::subscription::get_status,

        // --- Platform ---
        handlers::platform::suspend_tenant,
        handlers::platform::reinstate_tenant,
    ),
    components(
        schemas(
            models::auth::PrincipalResponse,
            models::tenancy::TenantRecord,
            models::tenancy::TenantStatus,
            models::subscription::SubscriptionStatus,
            models::subscription::SubscriptionState,
            models::subscription::PlanLimits,
            models::session::DbSessionContext,
            handlers::session::SessionContextResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Verificação de saúde"),
        (name = "Auth", description = "Usuário autenticado"),
        (name = "Session", description = "Contexto RLS da conexão"),
        (name = "Subscriptions", description = "Estado da assinatura"),
        (name = "Platform", description = "Ciclo de vida dos tenants (SuperAdmin)")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
