// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};
use std::sync::Arc;

use crate::{
    common::error::AppError,
    models::auth::{Claims, UserPrincipal},
};

// Só decodifica e valida tokens emitidos pelo serviço de login.
#[derive(Clone)]
pub struct ClaimsDecoder {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl ClaimsDecoder {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(jwt_secret.as_ref())),
            validation: Validation::default(),
        }
    }

    pub fn decode(&self, token: &str) -> Result<UserPrincipal, AppError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims.into())
    }

    /// Extrai o token de um header `Authorization: Bearer ...`.
    pub fn bearer(header: Option<&str>) -> Option<&str> {
        header?.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::auth::{BranchAccess, Role};
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    pub(crate) const SECRET: &str = "segredo-de-teste";

    pub(crate) fn token_for(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_ref()),
        )
        .unwrap()
    }

    pub(crate) fn claims(tenant_id: Option<Uuid>, role: &str) -> Claims {
        let now = Utc::now().timestamp() as usize;
        Claims {
            sub: Uuid::new_v4(),
            tenant_id,
            role: role.to_string(),
            branch_id: None,
            branch_access: None,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn decodes_claims_into_principal() {
        let tenant = Uuid::new_v4();
        let mut c = claims(Some(tenant), "branch_manager");
        c.branch_id = Some("B1".into());
        c.branch_access = Some(vec!["B1".into(), "B3".into()]);

        let principal = ClaimsDecoder::new(SECRET).decode(&token_for(&c)).unwrap();
        assert_eq!(principal.tenant_id, Some(tenant));
        assert_eq!(principal.role, Role::BranchManager);
        assert_eq!(principal.own_branch_id.as_deref(), Some("B1"));
        assert!(matches!(principal.branch_access, Some(BranchAccess::Only(_))));
    }

    #[test]
    fn rejects_foreign_signature_and_expired_tokens() {
        let decoder = ClaimsDecoder::new("outro-segredo");
        let token = token_for(&claims(None, "admin"));
        assert!(matches!(decoder.decode(&token), Err(AppError::InvalidToken)));

        let mut expired = claims(None, "admin");
        expired.exp = 1_000;
        let token = token_for(&expired);
        assert!(matches!(
            ClaimsDecoder::new(SECRET).decode(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(ClaimsDecoder::bearer(Some("Bearer abc")), Some("abc"));
        assert_eq!(ClaimsDecoder::bearer(Some("Basic abc")), None);
        assert_eq!(ClaimsDecoder::bearer(Some("Bearer ")), None);
        assert_eq!(ClaimsDecoder::bearer(None), None);
    }
}
