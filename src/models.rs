use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The closed set of roles recognized by the forum. The role is the sole
/// axis of authorization: every protected operation declares which of these
/// it accepts, and the login contract requires callers to assert one of them
/// up front.
///
/// Stored in the database as the lowercase strings `student`, `faculty`,
/// `admin`; serialized the same way on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Student,
    Faculty,
    Admin,
}

impl Role {
    /// The canonical lowercase form, as stored and serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Admin => "admin",
        }
    }

    /// Capitalized form used in human-facing messages ("Student login successful!").
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Student => "Student",
            Role::Faculty => "Faculty",
            Role::Admin => "Admin",
        }
    }

    /// Parses a role as submitted by a client: whitespace-trimmed and
    /// case-insensitive. Returns `None` for anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "faculty" => Some(Role::Faculty),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row-decoding conversion for the TEXT `role` column (`#[sqlx(try_from = "String")]`).
impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value).ok_or_else(|| format!("unknown role in database: {value:?}"))
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Account
///
/// The canonical identity record from the `accounts` table, including the
/// password hash. This struct never crosses the API boundary; callers see
/// `AccountView` instead, which omits the hash.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Account {
    pub id: Uuid,
    // Unique login identifier.
    pub username: String,
    // Argon2id PHC string. Never serialized.
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    // Suspension flag. `false` blocks new logins but not tokens already issued.
    pub active: bool,
}

/// Query
///
/// A student's question from the `queries` table. `answered` flips to true
/// when the first response arrives and is never reset afterwards, even if
/// every response is later deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Query {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    // FK to accounts.id (the student owner).
    pub student_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub answered: bool,
}

/// Response
///
/// A faculty answer from the `responses` table. Many responses may attach to
/// one query.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Response {
    pub id: Uuid,
    // FK to queries.id.
    pub query_id: Uuid,
    // FK to accounts.id (the faculty author).
    pub faculty_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// --- Projections (Output Schemas) ---

/// AccountView
///
/// The wire-safe projection of an `Account`: everything except the password
/// hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub active: bool,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        AccountView {
            id: account.id,
            username: account.username,
            role: account.role,
            active: account.active,
        }
    }
}

/// ResponseView
///
/// A response as embedded inside a `QueryView`, ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResponseView {
    pub id: Uuid,
    pub content: String,
    pub faculty_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<Response> for ResponseView {
    fn from(r: Response) -> Self {
        ResponseView {
            id: r.id,
            content: r.content,
            faculty_id: r.faculty_id,
            created_at: r.created_at,
        }
    }
}

/// QueryView
///
/// A query together with its ordered list of responses. This is the read
/// shape served by every query-listing endpoint, public or admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct QueryView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub student_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub answered: bool,
    pub responses: Vec<ResponseView>,
}

/// FacultyResponseView
///
/// A faculty member's own response paired with the parent query's title and
/// description. The fallback strings cover the case of a response whose
/// parent query row is missing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct FacultyResponseView {
    pub response_id: Uuid,
    pub content: String,
    pub query_title: String,
    pub query_description: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AdminStats
///
/// Aggregate counters for the admin dashboard.
///
/// The source system computed "answered" two different ways on two read
/// paths: by the `answered` flag, and by the presence of at least one
/// response. Both are served under separate names because they diverge once
/// responses are deleted (the flag is never reset). `unanswered` derives
/// from the response-presence figure, matching the original arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub students: i64,
    pub faculty: i64,
    pub admins: i64,
    pub total_queries: i64,
    pub total_responses: i64,
    /// Queries whose `answered` flag is set.
    pub answered_by_flag: i64,
    /// Distinct queries referenced by at least one response.
    pub answered_by_response_presence: i64,
    pub unanswered: i64,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input for POST /auth/register. Fields are optional so that a missing
/// field produces the contract's 400 response rather than a body-rejection
/// status. The role arrives as a raw string and is parsed into the closed
/// `Role` set by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// LoginRequest
///
/// Input for POST /auth/login. The login contract requires the caller to
/// assert the expected role; a wrong assertion is rejected even when the
/// credentials themselves are correct.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// NewQueryRequest
///
/// Input for POST /queries/new.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewQueryRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// RespondRequest
///
/// Input for POST /queries/respond/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RespondRequest {
    pub content: Option<String>,
}

/// AddUserRequest
///
/// Input for the admin add-user endpoint. Unlike self-registration this may
/// create an account of any role, including `admin`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// ChangeRoleRequest
///
/// Input for PUT /admin/user/{id}/role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ChangeRoleRequest {
    pub role: Option<String>,
}

// --- Response Payloads (Output Schemas) ---

/// MessageResponse
///
/// The `{message}` body returned by mutations that produce no entity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// LoginResponse
///
/// Successful login: a human-readable message, the signed bearer token, and
/// the authenticated role for the client's routing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub role: Role,
}

/// ProfileResponse
///
/// Output of GET /auth/profile: the identity and role claims as resolved
/// from the presented token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileResponse {
    pub message: String,
    pub user: String,
    pub role: Role,
}

/// QueryCreatedResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct QueryCreatedResponse {
    pub message: String,
    pub query_id: Uuid,
}

/// ResponseCreatedResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResponseCreatedResponse {
    pub message: String,
    pub response_id: Uuid,
}

/// UserCreatedResponse
///
/// Output of the admin add-user endpoint: message plus the created account's
/// wire-safe projection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserCreatedResponse {
    pub message: String,
    pub user: AccountView,
}
