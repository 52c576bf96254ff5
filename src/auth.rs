use crate::error::{AppError, ErrorKind};
use axum::{
    async_trait,
    extract::{FromRequest, RequestParts, TypedHeader},
    headers::{authorization::Bearer, Authorization},
};
use jsonwebtoken::{
    errors::Result as JwtResult, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use std::{ops::Deref, time::Duration};

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

lazy_static::lazy_static! {
    static ref KEYS: Keys = {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        Keys {
            encoding: EncodingKey::from_base64_secret(&secret)
                .expect("JWT_SECRET is not valid base64"),
            decoding: DecodingKey::from_base64_secret(&secret)
                .expect("JWT_SECRET is not valid base64"),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: i32,
    pub role: Role,
    pub region: String,
    pub email: String,
    pub exp: u64,
}

/// The verified caller of a request, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
    pub region: String,
    pub email: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            user_id: claims.user_id,
            role: claims.role,
            region: claims.region,
            email: claims.email,
        }
    }
}

#[allow(unused_must_use)]
pub fn ensure_jwt_secret_is_valid() {
    KEYS.deref();
}

pub fn generate_jwt(identity: &Identity, exp: Duration) -> JwtResult<String> {
    jsonwebtoken::encode(
        &Header::default(),
        &Claims {
            user_id: identity.user_id,
            role: identity.role,
            region: identity.region.clone(),
            email: identity.email.clone(),
            exp: jsonwebtoken::get_current_timestamp() + exp.as_secs(),
        },
        &KEYS.encoding,
    )
}

pub fn validate_jwt(token: &str) -> JwtResult<TokenData<Claims>> {
    jsonwebtoken::decode::<Claims>(token, &KEYS.decoding, &Validation::default())
}

#[async_trait]
impl<B: Send> FromRequest<B> for Identity {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request(req)
                .await
                .map_err(|_| AppError::from(ErrorKind::Unauthorized, "missing bearer token"))?;

        let token = validate_jwt(bearer.token()).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AppError::from(ErrorKind::Unauthorized, "invalid or expired token")
        })?;

        Ok(token.claims.into())
    }
}

/// Extractor that only admits administrators.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub Identity);

#[async_trait]
impl<B: Send> FromRequest<B> for AdminOnly {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request(req).await?;
        if !identity.is_admin() {
            return Err(AppError::from(
                ErrorKind::Forbidden,
                "administrator privileges are required",
            ));
        }
        Ok(AdminOnly(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_carry_the_caller_identity() {
        // base64 of "club-hub-test-secret"
        std::env::set_var("JWT_SECRET", "Y2x1Yi1odWItdGVzdC1zZWNyZXQ=");

        let identity = Identity {
            user_id: 7,
            role: Role::Admin,
            region: "Seoul".to_string(),
            email: "admin@example.com".to_string(),
        };
        let token = generate_jwt(&identity, Duration::from_secs(60)).unwrap();
        let decoded: Identity = validate_jwt(&token).unwrap().claims.into();

        assert_eq!(decoded, identity);
        assert!(decoded.is_admin());
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        std::env::set_var("JWT_SECRET", "Y2x1Yi1odWItdGVzdC1zZWNyZXQ=");
        assert!(validate_jwt("not-a-token").is_err());
    }
}
