//! Authentication collaborator and typed request context

use async_trait::async_trait;
use chrono::Utc;
use donation_core::{PaymentError, PaymentResult, Role, UserId};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: UserId::new(user_id),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Per-request context, populated once by the [`Authenticator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub principal: Principal,
    /// Correlation id for logs
    pub request_id: String,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    /// Authenticate an `Authorization` header value (`Bearer <token>`)
    pub async fn from_authorization(
        authenticator: &dyn Authenticator,
        header: &str,
    ) -> PaymentResult<Self> {
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PaymentError::Unauthorized("missing bearer token".to_string()))?;

        Ok(Self::new(authenticator.authenticate(token).await?))
    }

    pub fn user_id(&self) -> &UserId {
        &self.principal.user_id
    }
}

/// Turns a credential into a [`Principal`]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> PaymentResult<Principal>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

/// HS256 bearer tokens
pub struct JwtAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
    ttl_secs: i64,
}

impl JwtAuthenticator {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            issuer: None,
            ttl_secs,
        }
    }

    /// Require and stamp an issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        self.validation.set_issuer(&[issuer.as_str()]);
        self.issuer = Some(issuer);
        self
    }

    /// Mint a token for `principal`
    pub fn issue(&self, principal: &Principal) -> PaymentResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: principal.user_id.to_string(),
            email: principal.email.clone(),
            role: principal.role,
            iat: now,
            exp: now + self.ttl_secs,
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| PaymentError::Internal(format!("failed to sign token: {}", e)))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> PaymentResult<Principal> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| PaymentError::Unauthorized(e.to_string()))?;

        Ok(Principal {
            user_id: UserId::new(data.claims.sub),
            email: data.claims.email,
            role: data.claims.role,
        })
    }
}
