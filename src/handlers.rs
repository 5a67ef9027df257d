use crate::{
    AppState,
    auth::{AdminOnly, AnyRole, FacultyOnly, Guard, OptionalAuthUser, StudentOnly},
    error::ApiError,
    models::{
        AccountView, AddUserRequest, AdminStats, ChangeRoleRequest, FacultyResponseView,
        LoginRequest, LoginResponse, MessageResponse, NewQueryRequest, ProfileResponse,
        QueryCreatedResponse, QueryView, RegisterRequest, RespondRequest, ResponseCreatedResponse,
        Role, UserCreatedResponse,
    },
    password,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Auth Handlers ---

/// register
///
/// [Public Route] Self-registration. Validates field presence and the role
/// against the closed set, hashes the password, and creates the account.
/// Duplicate usernames are rejected by the store's atomic insert.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = MessageResponse),
        (status = 400, description = "Missing fields, invalid role, or duplicate username")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let (Some(username), Some(pw), Some(role_raw)) = (payload.username, payload.password, payload.role)
    else {
        return Err(ApiError::validation(
            "Missing fields (username, password, role)",
        ));
    };

    let role = Role::parse(&role_raw).ok_or_else(|| {
        ApiError::validation("Invalid role. Must be student, faculty, or admin.")
    })?;

    let password_hash = password::hash_password(&pw)?;
    let account = state
        .repo
        .create_account(&username, &password_hash, role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("User '{}' registered successfully!", account.username),
        }),
    ))
}

/// login
///
/// [Public Route] Authenticates a credential and issues a session token.
///
/// The caller must assert the expected role in the request body; a wrong
/// assertion is a 403 even with correct credentials, rather than the role
/// being inferred from the account. The checks run in a fixed order:
/// missing role (400), empty credentials (400), unknown role (400), unknown
/// user (404), bad password (401), role mismatch (403), suspended (403).
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Incorrect password"),
        (status = 403, description = "Role mismatch or suspended account"),
        (status = 404, description = "Unknown username")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let role_raw = payload.role.unwrap_or_default();
    if role_raw.trim().is_empty() {
        return Err(ApiError::validation("Role selection is required"));
    }

    let username = payload.username.unwrap_or_default().trim().to_string();
    let pw = payload.password.unwrap_or_default().trim().to_string();
    if username.is_empty() || pw.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let claimed_role = Role::parse(&role_raw).ok_or_else(|| {
        ApiError::validation(format!(
            "Invalid role '{}'. Must be one of: student, faculty, admin.",
            role_raw.trim()
        ))
    })?;

    let account = state
        .repo
        .get_account_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !password::verify_password(&pw, &account.password_hash)? {
        return Err(ApiError::Unauthenticated("Incorrect password".to_string()));
    }

    if account.role != claimed_role {
        return Err(ApiError::forbidden(format!(
            "Role mismatch. Please login as a {}.",
            account.role
        )));
    }

    if !account.active {
        return Err(ApiError::forbidden("Account suspended. Contact admin."));
    }

    let token = state.tokens.issue(&account.username, account.role)?;

    Ok(Json(LoginResponse {
        message: format!("{} login successful!", account.role.display_name()),
        token,
        role: account.role,
    }))
}

/// profile
///
/// [Authenticated Route] Echoes the identity and role claims resolved from
/// the presented token. Any role is accepted.
#[utoipa::path(
    get,
    path = "/auth/profile",
    responses((status = 200, description = "Token claims", body = ProfileResponse))
)]
pub async fn profile(Guard(user, _): Guard<AnyRole>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: "Access granted to protected route!".to_string(),
        user: user.username,
        role: user.role,
    })
}

// --- Query Handlers ---

/// list_queries
///
/// [Optional-Identity Route] Lists every query with its responses. Visible
/// to anonymous callers; a presented token is verified but an unverifiable
/// one simply demotes the request to anonymous.
#[utoipa::path(
    get,
    path = "/queries/",
    responses((status = 200, description = "All queries", body = [QueryView]))
)]
pub async fn list_queries(
    _identity: OptionalAuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QueryView>>, ApiError> {
    Ok(Json(state.repo.list_queries().await?))
}

/// get_query
///
/// [Optional-Identity Route] A single query with its ordered responses.
#[utoipa::path(
    get,
    path = "/queries/{id}",
    params(("id" = Uuid, Path, description = "Query ID")),
    responses(
        (status = 200, description = "Found", body = QueryView),
        (status = 404, description = "Unknown query")
    )
)]
pub async fn get_query(
    _identity: OptionalAuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueryView>, ApiError> {
    state
        .repo
        .get_query(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Query not found"))
}

/// my_queries
///
/// [Student Route] The authenticated student's own queries. The owning
/// account is resolved from the token's subject; a token for a since-deleted
/// account yields 404.
#[utoipa::path(
    get,
    path = "/queries/my",
    responses((status = 200, description = "Own queries", body = [QueryView]))
)]
pub async fn my_queries(
    Guard(user, _): Guard<StudentOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<QueryView>>, ApiError> {
    let account = state
        .repo
        .get_account_by_username(&user.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(state.repo.list_queries_by_student(account.id).await?))
}

/// create_query
///
/// [Student Route] Posts a new query owned by the authenticated student,
/// stamped with the current UTC time and `answered = false`.
#[utoipa::path(
    post,
    path = "/queries/new",
    request_body = NewQueryRequest,
    responses(
        (status = 201, description = "Posted", body = QueryCreatedResponse),
        (status = 400, description = "Empty title or description")
    )
)]
pub async fn create_query(
    Guard(user, _): Guard<StudentOnly>,
    State(state): State<AppState>,
    Json(payload): Json<NewQueryRequest>,
) -> Result<(StatusCode, Json<QueryCreatedResponse>), ApiError> {
    let title = payload.title.unwrap_or_default().trim().to_string();
    let description = payload.description.unwrap_or_default().trim().to_string();
    if title.is_empty() || description.is_empty() {
        return Err(ApiError::validation("Title and description are required"));
    }

    let account = state
        .repo
        .get_account_by_username(&user.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let query = state
        .repo
        .create_query(account.id, &title, &description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(QueryCreatedResponse {
            message: "Query posted successfully".to_string(),
            query_id: query.id,
        }),
    ))
}

/// respond
///
/// [Faculty Route] Attaches a response to a query. The first response flips
/// the query's `answered` flag; later responses are permitted and leave the
/// flag as it is.
#[utoipa::path(
    post,
    path = "/queries/respond/{id}",
    params(("id" = Uuid, Path, description = "Query ID")),
    request_body = RespondRequest,
    responses(
        (status = 201, description = "Response recorded", body = ResponseCreatedResponse),
        (status = 400, description = "Empty content"),
        (status = 404, description = "Unknown query")
    )
)]
pub async fn respond(
    Guard(user, _): Guard<FacultyOnly>,
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
    Json(payload): Json<RespondRequest>,
) -> Result<(StatusCode, Json<ResponseCreatedResponse>), ApiError> {
    let content = payload.content.unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Err(ApiError::validation("Response content is required"));
    }

    let account = state
        .repo
        .get_account_by_username(&user.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let response = state
        .repo
        .add_response(query_id, account.id, &content)
        .await?
        .ok_or_else(|| ApiError::not_found("Query not found"))?;

    Ok((
        StatusCode::CREATED,
        Json(ResponseCreatedResponse {
            message: "Response added successfully".to_string(),
            response_id: response.id,
        }),
    ))
}

/// my_responses
///
/// [Faculty Route] The authenticated faculty member's responses, each with
/// its parent query's title and description.
#[utoipa::path(
    get,
    path = "/queries/responses/my",
    responses((status = 200, description = "Own responses", body = [FacultyResponseView]))
)]
pub async fn my_responses(
    Guard(user, _): Guard<FacultyOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<FacultyResponseView>>, ApiError> {
    let account = state
        .repo
        .get_account_by_username(&user.username)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(
        state.repo.list_responses_by_faculty(account.id).await?,
    ))
}

// --- Admin Handlers ---

/// admin_stats
///
/// [Admin Route] Dashboard counters, including both historic "answered"
/// definitions side by side.
#[utoipa::path(
    get,
    path = "/queries/admin/stats",
    responses((status = 200, description = "Stats", body = AdminStats))
)]
pub async fn admin_stats(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.repo.admin_stats().await?))
}

/// admin_overview
///
/// [Admin Route] The second statistics read path of the console. Serves the
/// same document as `admin_stats` so both answered metrics stay visible on
/// either path.
#[utoipa::path(
    get,
    path = "/admin/overview",
    responses((status = 200, description = "Overview", body = AdminStats))
)]
pub async fn admin_overview(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.repo.admin_stats().await?))
}

/// admin_queries
///
/// [Admin Route] The console's view of all queries with responses; same
/// projection as the public listing.
#[utoipa::path(
    get,
    path = "/queries/admin/queries",
    responses((status = 200, description = "All queries", body = [QueryView]))
)]
pub async fn admin_queries(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<QueryView>>, ApiError> {
    Ok(Json(state.repo.list_queries().await?))
}

/// admin_users
///
/// [Admin Route] All accounts, without password hashes.
#[utoipa::path(
    get,
    path = "/queries/admin/users",
    responses((status = 200, description = "All accounts", body = [AccountView]))
)]
pub async fn admin_users(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountView>>, ApiError> {
    Ok(Json(state.repo.list_accounts().await?))
}

/// add_user
///
/// [Admin Route] Creates an account with an explicit role. Same validation
/// as self-registration, but an admin may create accounts of any role,
/// including `admin`.
#[utoipa::path(
    post,
    path = "/queries/admin/add_user",
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "Created", body = UserCreatedResponse),
        (status = 400, description = "Missing fields, invalid role, or duplicate username")
    )
)]
pub async fn add_user(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Json(payload): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), ApiError> {
    let (Some(username), Some(pw), Some(role_raw)) = (payload.username, payload.password, payload.role)
    else {
        return Err(ApiError::validation(
            "Username, password, and role are required",
        ));
    };
    if username.is_empty() || pw.is_empty() || role_raw.trim().is_empty() {
        return Err(ApiError::validation(
            "Username, password, and role are required",
        ));
    }

    let role = Role::parse(&role_raw)
        .ok_or_else(|| ApiError::validation("Invalid role. Must be student, faculty, or admin"))?;

    let password_hash = password::hash_password(&pw)?;
    let account = state
        .repo
        .create_account(&username, &password_hash, role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse {
            message: format!("{} added successfully", role.display_name()),
            user: AccountView::from(account),
        }),
    ))
}

/// suspend_user
///
/// [Admin Route] Sets `active = false`. Existing tokens for the account
/// remain valid until expiry; only future logins are blocked.
#[utoipa::path(
    patch,
    path = "/queries/admin/suspend_user/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Suspended", body = MessageResponse),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn suspend_user(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state.repo.set_active(id, false).await?;

    Ok(Json(MessageResponse {
        message: format!("User {} suspended successfully", account.username),
    }))
}

/// unsuspend_user
///
/// [Admin Route] Sets `active = true`. Idempotent: unsuspending an active
/// account succeeds and changes nothing.
#[utoipa::path(
    patch,
    path = "/queries/admin/unsuspend_user/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Unsuspended", body = MessageResponse),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn unsuspend_user(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state.repo.set_active(id, true).await?;

    Ok(Json(MessageResponse {
        message: format!("User {} unsuspended successfully", account.username),
    }))
}

/// delete_user
///
/// [Admin Route] Removes an account. Fails with 400 while the account still
/// owns queries or responses, so author references never dangle.
#[utoipa::path(
    delete,
    path = "/queries/admin/delete_user/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 400, description = "Account still owns queries or responses"),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn delete_user(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let account = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !state.repo.delete_account(id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    Ok(Json(MessageResponse {
        message: format!("User '{}' deleted successfully", account.username),
    }))
}

/// change_role
///
/// [Admin Route] Promotes or demotes an account within the closed role set.
#[utoipa::path(
    put,
    path = "/admin/user/{id}/role",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Updated", body = MessageResponse),
        (status = 400, description = "Invalid role"),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn change_role(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let role = payload
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::validation("Invalid role specified"))?;

    let account = state
        .repo
        .get_account(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state.repo.set_role(id, role).await?;

    Ok(Json(MessageResponse {
        message: format!("User '{}' role updated to {}", account.username, role),
    }))
}

/// delete_query
///
/// [Admin Route] Removes a query and all of its responses in one
/// transaction.
#[utoipa::path(
    delete,
    path = "/queries/admin/delete_query/{id}",
    params(("id" = Uuid, Path, description = "Query ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Unknown query")
    )
)]
pub async fn delete_query(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_query(id).await? {
        return Err(ApiError::not_found("Query not found"));
    }

    Ok(Json(MessageResponse {
        message: format!("Query {id} and all associated responses deleted successfully"),
    }))
}

/// delete_response
///
/// [Admin Route] Removes a single response. The parent query's `answered`
/// flag is left untouched, even when this was the only response; the two
/// answered statistics diverge from here on.
#[utoipa::path(
    delete,
    path = "/queries/admin/delete_response/{id}",
    params(("id" = Uuid, Path, description = "Response ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Unknown response")
    )
)]
pub async fn delete_response(
    _guard: Guard<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.repo.delete_response(id).await? {
        return Err(ApiError::not_found("Response not found"));
    }

    Ok(Json(MessageResponse {
        message: format!("Response {id} deleted successfully"),
    }))
}
