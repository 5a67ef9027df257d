use std::convert::Infallible;
use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, error::ApiError, models::Role};

/// Claims
///
/// The signed payload carried inside every session token. The subject is
/// the username; the role claim is the single authorization input consumed
/// by the guard. Tokens are stateless: nothing here references server-side
/// session state, so suspending an account does not invalidate tokens that
/// were issued before the suspension.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account's username.
    pub sub: String,
    /// The account's role at issue time.
    pub role: Role,
    /// Expiration time (exp): timestamp after which the token is rejected.
    pub exp: usize,
    /// Issued at (iat): timestamp of issuance.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request: the verified token's
/// subject and role claim. This is what the guard injects into handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: Role,
}

/// TokenIssuer
///
/// Issues and verifies the signed, time-bounded session tokens. The signing
/// secret and token lifetime come from `AppConfig` at construction; the
/// issuer itself lives in the shared application state.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    /// issue
    ///
    /// Signs a token for a freshly authenticated identity, with a fixed
    /// expiry window of `ttl_secs` from now.
    pub fn issue(&self, username: &str, role: Role) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
    }

    /// verify
    ///
    /// Decodes and validates a presented token. Expiry and signature
    /// failures both surface as `Unauthenticated`; the distinction is kept
    /// in the message only.
    pub fn verify(&self, token: &str) -> Result<AuthUser, ApiError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    ApiError::Unauthenticated("Token expired".to_string())
                }
                _ => ApiError::Unauthenticated("Invalid token".to_string()),
            })?;

        Ok(AuthUser {
            username: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }
}

// --- Authorization Guard ---

/// RolePredicate
///
/// A per-operation role requirement, declared once in the handler's
/// signature and enforced uniformly by the `Guard` extractor. This replaces
/// scattered `role != "admin"` string checks inside handler bodies: the
/// predicate is the single place the policy for an operation is stated.
pub trait RolePredicate: Send + Sync {
    /// Message returned with the 403 when the predicate rejects a role.
    const FORBIDDEN_MSG: &'static str;

    fn allows(role: Role) -> bool;
}

/// Any authenticated identity, regardless of role.
pub struct AnyRole;

/// Requires exactly `Role::Student`.
pub struct StudentOnly;

/// Requires exactly `Role::Faculty`.
pub struct FacultyOnly;

/// Requires exactly `Role::Admin`.
pub struct AdminOnly;

impl RolePredicate for AnyRole {
    const FORBIDDEN_MSG: &'static str = "Access forbidden";

    fn allows(_role: Role) -> bool {
        true
    }
}

impl RolePredicate for StudentOnly {
    const FORBIDDEN_MSG: &'static str = "Access forbidden: Students only";

    fn allows(role: Role) -> bool {
        role == Role::Student
    }
}

impl RolePredicate for FacultyOnly {
    const FORBIDDEN_MSG: &'static str = "Access forbidden: Faculty only";

    fn allows(role: Role) -> bool {
        role == Role::Faculty
    }
}

impl RolePredicate for AdminOnly {
    const FORBIDDEN_MSG: &'static str = "Access forbidden: Admin only";

    fn allows(role: Role) -> bool {
        role == Role::Admin
    }
}

/// Guard
///
/// The request-processing authorization step, usable as a handler argument:
/// `Guard(user, _): Guard<AdminOnly>`. One `FromRequestParts` impl serves
/// every predicate:
///
/// 1. Extract the bearer token; absent ⇒ 401.
/// 2. Verify it with the `TokenIssuer`; invalid or expired ⇒ 401.
/// 3. Apply the predicate to the role claim; rejected ⇒ 403.
/// 4. Inject the resolved `AuthUser` into the handler.
///
/// The guard reads nothing but the token. In particular it does not consult
/// the account table, so a token outlives the suspension of its account
/// until it expires.
pub struct Guard<P: RolePredicate>(pub AuthUser, pub PhantomData<P>);

impl<S, P> FromRequestParts<S> for Guard<P>
where
    S: Send + Sync,
    P: RolePredicate,
    // Allows the extractor to pull the TokenIssuer from the app state.
    TokenIssuer: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let issuer = TokenIssuer::from_ref(state);

        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthenticated("Missing bearer token".to_string()))?;

        let user = issuer.verify(token)?;

        if !P::allows(user.role) {
            return Err(ApiError::forbidden(P::FORBIDDEN_MSG));
        }

        Ok(Guard(user, PhantomData))
    }
}

/// OptionalAuthUser
///
/// The `optional` predicate: identity if a valid token is presented,
/// anonymous otherwise. A malformed or expired token is treated the same as
/// no token at all; it is not retried and not rejected.
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    TokenIssuer: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let issuer = TokenIssuer::from_ref(state);

        let user = bearer_token(parts).and_then(|token| issuer.verify(token).ok());

        Ok(OptionalAuthUser(user))
    }
}

/// Pulls the token out of a `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}
