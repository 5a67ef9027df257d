use crate::error::ApiError;
use crate::models::{
    Account, AccountView, AdminStats, FacultyResponseView, Query, QueryView, Response,
    ResponseView, Role,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The abstract contract for all persistence operations, so handlers
/// interact with the data layer without knowing the concrete backing store
/// (Postgres in production, an in-memory implementation in tests).
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn
/// Repository>`) shareable across Axum's asynchronous task boundaries.
///
/// Every method returns `Result`: store failures surface as
/// `ApiError::Internal` rather than being swallowed, and `Option`/`bool`
/// results distinguish "entity absent" from "operation failed".
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Credential Store ---

    /// Inserts a new account. Fails with `Conflict` when the username is
    /// already taken; uniqueness is enforced by the insert itself, not by a
    /// separate read.
    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Account, ApiError>;

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, ApiError>;
    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>, ApiError>;
    async fn list_accounts(&self) -> Result<Vec<AccountView>, ApiError>;

    /// Admin mutation. Returns false when the id is unknown.
    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool, ApiError>;
    /// Admin mutation, idempotent: setting the current value again succeeds.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, ApiError>;
    /// Admin mutation. Returns false when the id is unknown; fails with
    /// `Conflict` while the account still owns queries or responses, so no
    /// dangling author references can be created.
    async fn delete_account(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Query/Response Store ---

    /// Inserts a query owned by the given student, stamped with the current
    /// UTC time and `answered = false`.
    async fn create_query(
        &self,
        student_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Query, ApiError>;

    async fn get_query(&self, id: Uuid) -> Result<Option<QueryView>, ApiError>;
    async fn list_queries(&self) -> Result<Vec<QueryView>, ApiError>;
    async fn list_queries_by_student(&self, student_id: Uuid) -> Result<Vec<QueryView>, ApiError>;

    /// Inserts a response and flips the parent query's `answered` flag if it
    /// was still false, both inside one transaction. The flip is idempotent;
    /// later responses leave the flag untouched. Returns `None` when the
    /// query does not exist.
    async fn add_response(
        &self,
        query_id: Uuid,
        faculty_id: Uuid,
        content: &str,
    ) -> Result<Option<Response>, ApiError>;

    async fn list_responses_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<FacultyResponseView>, ApiError>;

    /// Two-phase cascade inside one transaction: all responses of the query
    /// first, then the query itself. Returns false when the id is unknown.
    async fn delete_query(&self, id: Uuid) -> Result<bool, ApiError>;

    /// Deletes a single response. The parent query's `answered` flag is not
    /// re-evaluated, even when this was the only response.
    async fn delete_response(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Statistics ---

    /// Aggregate counters, including both historic "answered" definitions
    /// under their own names.
    async fn admin_stats(&self) -> Result<AdminStats, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The production implementation of the `Repository` trait, backed by a
/// PostgreSQL connection pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, password_hash, role, active";
const QUERY_COLUMNS: &str = "id, title, description, student_id, created_at, answered";
const RESPONSE_COLUMNS: &str = "id, query_id, faculty_id, content, created_at";

/// Groups flat response rows under their queries, preserving the rows'
/// creation-time order within each query.
fn assemble_views(queries: Vec<Query>, responses: Vec<Response>) -> Vec<QueryView> {
    let mut by_query: HashMap<Uuid, Vec<ResponseView>> = HashMap::new();
    for response in responses {
        by_query
            .entry(response.query_id)
            .or_default()
            .push(ResponseView::from(response));
    }

    queries
        .into_iter()
        .map(|q| QueryView {
            responses: by_query.remove(&q.id).unwrap_or_default(),
            id: q.id,
            title: q.title,
            description: q.description,
            student_id: q.student_id,
            created_at: q.created_at,
            answered: q.answered,
        })
        .collect()
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Credential Store ---

    /// create_account
    ///
    /// `ON CONFLICT DO NOTHING` plus `RETURNING` makes the uniqueness check
    /// and the insert one atomic statement; no row back means the username
    /// was already taken.
    async fn create_account(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Account, ApiError> {
        let sql = format!(
            "INSERT INTO accounts (id, username, password_hash, role, active) \
             VALUES ($1, $2, $3, $4, TRUE) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::Conflict("Username already exists".to_string()))
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, ApiError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>, ApiError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_accounts(&self) -> Result<Vec<AccountView>, ApiError> {
        Ok(sqlx::query_as::<_, AccountView>(
            "SELECT id, username, role, active FROM accounts ORDER BY username ASC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<bool, ApiError> {
        let result = sqlx::query("UPDATE accounts SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, ApiError> {
        let result = sqlx::query("UPDATE accounts SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// delete_account
    ///
    /// The dependent check and the delete share one transaction, so a query
    /// posted between them cannot slip through.
    async fn delete_account(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        let owned_queries: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM queries WHERE student_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        let owned_responses: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE faculty_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if owned_queries > 0 || owned_responses > 0 {
            return Err(ApiError::Conflict(
                "Cannot delete user with existing queries or responses".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Query/Response Store ---

    async fn create_query(
        &self,
        student_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Query, ApiError> {
        let sql = format!(
            "INSERT INTO queries (id, title, description, student_id, created_at, answered) \
             VALUES ($1, $2, $3, $4, NOW(), FALSE) \
             RETURNING {QUERY_COLUMNS}"
        );

        Ok(sqlx::query_as::<_, Query>(&sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(description)
            .bind(student_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_query(&self, id: Uuid) -> Result<Option<QueryView>, ApiError> {
        let sql = format!("SELECT {QUERY_COLUMNS} FROM queries WHERE id = $1");
        let Some(query) = sqlx::query_as::<_, Query>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {RESPONSE_COLUMNS} FROM responses WHERE query_id = $1 ORDER BY created_at ASC"
        );
        let responses = sqlx::query_as::<_, Response>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(assemble_views(vec![query], responses).pop())
    }

    async fn list_queries(&self) -> Result<Vec<QueryView>, ApiError> {
        let sql = format!("SELECT {QUERY_COLUMNS} FROM queries ORDER BY created_at ASC");
        let queries = sqlx::query_as::<_, Query>(&sql).fetch_all(&self.pool).await?;

        let sql = format!("SELECT {RESPONSE_COLUMNS} FROM responses ORDER BY created_at ASC");
        let responses = sqlx::query_as::<_, Response>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(assemble_views(queries, responses))
    }

    async fn list_queries_by_student(&self, student_id: Uuid) -> Result<Vec<QueryView>, ApiError> {
        let sql = format!(
            "SELECT {QUERY_COLUMNS} FROM queries WHERE student_id = $1 ORDER BY created_at ASC"
        );
        let queries = sqlx::query_as::<_, Query>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!(
            "SELECT r.id, r.query_id, r.faculty_id, r.content, r.created_at \
             FROM responses r JOIN queries q ON r.query_id = q.id \
             WHERE q.student_id = $1 ORDER BY r.created_at ASC"
        );
        let responses = sqlx::query_as::<_, Response>(&sql)
            .bind(student_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(assemble_views(queries, responses))
    }

    /// add_response
    ///
    /// Existence check, insert, and the guarded flag flip run in one
    /// transaction. `answered = TRUE ... WHERE answered = FALSE` only
    /// touches the row on the first response; concurrent responders race
    /// harmlessly because both writers set the same value.
    async fn add_response(
        &self,
        query_id: Uuid,
        faculty_id: Uuid,
        content: &str,
    ) -> Result<Option<Response>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM queries WHERE id = $1")
            .bind(query_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let sql = format!(
            "INSERT INTO responses (id, query_id, faculty_id, content, created_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             RETURNING {RESPONSE_COLUMNS}"
        );
        let response = sqlx::query_as::<_, Response>(&sql)
            .bind(Uuid::new_v4())
            .bind(query_id)
            .bind(faculty_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE queries SET answered = TRUE WHERE id = $1 AND answered = FALSE")
            .bind(query_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(response))
    }

    /// list_responses_by_faculty
    ///
    /// LEFT JOIN with COALESCE keeps the projection shape stable even for a
    /// response whose parent query row is missing.
    async fn list_responses_by_faculty(
        &self,
        faculty_id: Uuid,
    ) -> Result<Vec<FacultyResponseView>, ApiError> {
        Ok(sqlx::query_as::<_, FacultyResponseView>(
            "SELECT r.id AS response_id, r.content, \
                    COALESCE(q.title, 'Unknown Query') AS query_title, \
                    COALESCE(q.description, 'No description') AS query_description, \
                    r.created_at \
             FROM responses r LEFT JOIN queries q ON r.query_id = q.id \
             WHERE r.faculty_id = $1 ORDER BY r.created_at ASC",
        )
        .bind(faculty_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// delete_query
    ///
    /// Responses first, then the query, in one transaction; either both
    /// deletes commit or neither does.
    async fn delete_query(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM responses WHERE query_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM queries WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_response(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM responses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Statistics ---

    /// admin_stats
    ///
    /// Compiles the dashboard counters. `answered_by_flag` counts the
    /// monotonic flag; `answered_by_response_presence` counts distinct query
    /// ids among responses. They diverge once responses are deleted, and
    /// both are reported.
    async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;

        let mut by_role = [0i64; 3];
        for (slot, role) in by_role
            .iter_mut()
            .zip([Role::Student, Role::Faculty, Role::Admin])
        {
            *slot = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = $1")
                .bind(role.as_str())
                .fetch_one(&self.pool)
                .await?;
        }
        let [students, faculty, admins] = by_role;

        let total_queries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queries")
            .fetch_one(&self.pool)
            .await?;
        let total_responses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responses")
            .fetch_one(&self.pool)
            .await?;
        let answered_by_flag: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM queries WHERE answered = TRUE")
                .fetch_one(&self.pool)
                .await?;
        let answered_by_response_presence: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT query_id) FROM responses")
                .fetch_one(&self.pool)
                .await?;

        Ok(AdminStats {
            total_users,
            students,
            faculty,
            admins,
            total_queries,
            total_responses,
            answered_by_flag,
            answered_by_response_presence,
            unanswered: total_queries - answered_by_response_presence,
        })
    }
}
