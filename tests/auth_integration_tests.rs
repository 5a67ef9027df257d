use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use chrono::Utc;
use fact_forum::{
    AppState,
    auth::{AdminOnly, AnyRole, Claims, FacultyOnly, Guard, OptionalAuthUser, StudentOnly, TokenIssuer},
    config::AppConfig,
    error::ApiError,
    models::{
        Account, AccountView, AdminStats, FacultyResponseView, Query, QueryView, Response, Role,
    },
    repository::Repository,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

// --- Stub Repository for Guard Logic ---
//
// The guard reads nothing but the token, so the stub only has to satisfy
// the trait. `account_to_return` exists to show that even a suspended
// account row does not influence token verification.

#[derive(Default)]
struct StubRepo {
    account_to_return: Option<Account>,
}

#[async_trait]
impl Repository for StubRepo {
    async fn create_account(
        &self,
        _username: &str,
        _password_hash: &str,
        _role: Role,
    ) -> Result<Account, ApiError> {
        Ok(Account::default())
    }
    async fn get_account(&self, _id: Uuid) -> Result<Option<Account>, ApiError> {
        Ok(self.account_to_return.clone())
    }
    async fn get_account_by_username(&self, _username: &str) -> Result<Option<Account>, ApiError> {
        Ok(self.account_to_return.clone())
    }
    async fn list_accounts(&self) -> Result<Vec<AccountView>, ApiError> {
        Ok(vec![])
    }
    async fn set_role(&self, _id: Uuid, _role: Role) -> Result<bool, ApiError> {
        Ok(false)
    }
    async fn set_active(&self, _id: Uuid, _active: bool) -> Result<bool, ApiError> {
        Ok(false)
    }
    async fn delete_account(&self, _id: Uuid) -> Result<bool, ApiError> {
        Ok(false)
    }
    async fn create_query(
        &self,
        _student_id: Uuid,
        _title: &str,
        _description: &str,
    ) -> Result<Query, ApiError> {
        Ok(Query::default())
    }
    async fn get_query(&self, _id: Uuid) -> Result<Option<QueryView>, ApiError> {
        Ok(None)
    }
    async fn list_queries(&self) -> Result<Vec<QueryView>, ApiError> {
        Ok(vec![])
    }
    async fn list_queries_by_student(&self, _student_id: Uuid) -> Result<Vec<QueryView>, ApiError> {
        Ok(vec![])
    }
    async fn add_response(
        &self,
        _query_id: Uuid,
        _faculty_id: Uuid,
        _content: &str,
    ) -> Result<Option<Response>, ApiError> {
        Ok(None)
    }
    async fn list_responses_by_faculty(
        &self,
        _faculty_id: Uuid,
    ) -> Result<Vec<FacultyResponseView>, ApiError> {
        Ok(vec![])
    }
    async fn delete_query(&self, _id: Uuid) -> Result<bool, ApiError> {
        Ok(false)
    }
    async fn delete_response(&self, _id: Uuid) -> Result<bool, ApiError> {
        Ok(false)
    }
    async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        Ok(AdminStats::default())
    }
}

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

/// Signs a token directly so tests can control the expiry offset, including
/// negative offsets for already-expired tokens.
fn create_token(username: &str, role: Role, exp_offset: i64) -> String {
    let now = Utc::now().timestamp();

    let claims = Claims {
        sub: username.to_string(),
        role,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(repo: StubRepo) -> AppState {
    AppState {
        repo: Arc::new(repo),
        tokens: TokenIssuer::new(TEST_JWT_SECRET, 3600),
        config: AppConfig::default(),
    }
}

/// Helper to get the mutable Parts struct from a generated Request.
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn parts_with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    parts
}

// --- TokenIssuer Tests ---

#[tokio::test]
async fn test_issue_and_verify_round_trip() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET, 3600);

    let token = issuer.issue("alice", Role::Faculty).unwrap();
    let user = issuer.verify(&token).unwrap();

    assert_eq!(user.username, "alice");
    assert_eq!(user.role, Role::Faculty);
}

#[tokio::test]
async fn test_verify_rejects_expired_token() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET, 3600);
    // Expired an hour ago; well past jsonwebtoken's default leeway.
    let token = create_token("alice", Role::Student, -3600);

    let err = issuer.verify(&token).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_rejects_wrong_signature() {
    let issuer = TokenIssuer::new("a-completely-different-secret", 3600);
    let token = create_token("alice", Role::Student, 3600);

    let err = issuer.verify(&token).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_verify_rejects_garbage_token() {
    let issuer = TokenIssuer::new(TEST_JWT_SECRET, 3600);

    let err = issuer.verify("not.a.token").unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated(_)));
}

// --- Guard Tests ---

#[tokio::test]
async fn test_guard_success_with_valid_jwt() {
    let state = create_app_state(StubRepo::default());
    let token = create_token("alice", Role::Student, 3600);
    let mut parts = parts_with_bearer(&token);

    let guard = Guard::<StudentOnly>::from_request_parts(&mut parts, &state).await;

    assert!(guard.is_ok());
    let Guard(user, _) = guard.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.role, Role::Student);
}

#[tokio::test]
async fn test_guard_failure_with_missing_header() {
    let state = create_app_state(StubRepo::default());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let guard = Guard::<AnyRole>::from_request_parts(&mut parts, &state).await;

    let err = guard.err().expect("missing header must be rejected");
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_failure_with_expired_jwt() {
    let state = create_app_state(StubRepo::default());
    let token = create_token("alice", Role::Student, -3600);
    let mut parts = parts_with_bearer(&token);

    let guard = Guard::<StudentOnly>::from_request_parts(&mut parts, &state).await;

    let err = guard.err().expect("expired token must be rejected");
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_rejects_wrong_role_with_forbidden() {
    let state = create_app_state(StubRepo::default());
    // A perfectly valid student token must not pass an admin-only guard.
    let token = create_token("alice", Role::Student, 3600);
    let mut parts = parts_with_bearer(&token);

    let guard = Guard::<AdminOnly>::from_request_parts(&mut parts, &state).await;

    let err = guard.err().expect("wrong role must be rejected");
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert!(matches!(err, ApiError::Forbidden(_)));
}

#[tokio::test]
async fn test_guard_any_role_accepts_all_roles() {
    let state = create_app_state(StubRepo::default());

    for role in [Role::Student, Role::Faculty, Role::Admin] {
        let token = create_token("anyone", role, 3600);
        let mut parts = parts_with_bearer(&token);

        let guard = Guard::<AnyRole>::from_request_parts(&mut parts, &state).await;
        assert!(guard.is_ok(), "AnyRole must accept {role}");
    }
}

#[tokio::test]
async fn test_guard_exact_role_predicates() {
    let state = create_app_state(StubRepo::default());
    let token = create_token("frank", Role::Faculty, 3600);

    let mut parts = parts_with_bearer(&token);
    assert!(
        Guard::<FacultyOnly>::from_request_parts(&mut parts, &state)
            .await
            .is_ok()
    );

    let mut parts = parts_with_bearer(&token);
    assert!(
        Guard::<StudentOnly>::from_request_parts(&mut parts, &state)
            .await
            .is_err()
    );
}

/// Suspension does not revoke live sessions: the guard never consults the
/// account table, so a token issued before `active` was cleared still
/// resolves.
#[tokio::test]
async fn test_guard_ignores_suspended_account_row() {
    let suspended = Account {
        id: Uuid::new_v4(),
        username: "suspended_user".to_string(),
        password_hash: "$argon2id$stub".to_string(),
        role: Role::Student,
        active: false,
    };
    let state = create_app_state(StubRepo {
        account_to_return: Some(suspended),
    });

    let token = create_token("suspended_user", Role::Student, 3600);
    let mut parts = parts_with_bearer(&token);

    let guard = Guard::<StudentOnly>::from_request_parts(&mut parts, &state).await;
    assert!(guard.is_ok());
}

// --- OptionalAuthUser Tests ---

#[tokio::test]
async fn test_optional_auth_absent_without_token() {
    let state = create_app_state(StubRepo::default());
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let OptionalAuthUser(identity) = OptionalAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert!(identity.is_none());
}

#[tokio::test]
async fn test_optional_auth_anonymous_on_invalid_token() {
    let state = create_app_state(StubRepo::default());
    // An unverifiable token demotes the request to anonymous instead of
    // rejecting it.
    let mut parts = parts_with_bearer("garbage-token");

    let OptionalAuthUser(identity) = OptionalAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert!(identity.is_none());
}

#[tokio::test]
async fn test_optional_auth_resolves_valid_token() {
    let state = create_app_state(StubRepo::default());
    let token = create_token("bob", Role::Faculty, 3600);
    let mut parts = parts_with_bearer(&token);

    let OptionalAuthUser(identity) = OptionalAuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    let user = identity.expect("valid token must resolve");
    assert_eq!(user.username, "bob");
    assert_eq!(user.role, Role::Faculty);
}
