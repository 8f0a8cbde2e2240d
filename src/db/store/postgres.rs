use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{DeleteGuard, Mutation, RequestStore, StoreError, UserStore};
use crate::db::models::travel_request::{
    AuditLogEntry, BookingResult, Comment, RequestDetails, RequestFilter, RequestType,
    TravelRequest,
};
use crate::db::models::profile::UserProfile;
use crate::db::models::user::{Role, User};
use crate::lifecycle::LifecycleError;

const SELECT_REQUEST: &str = r#"
    SELECT id, user_id, user_name, request_type, status, data, comments, history,
           booking_result, assigned_to, created_at, updated_at
    FROM travel_requests
    WHERE id = $1
"#;

const SELECT_REQUEST_FOR_UPDATE: &str = r#"
    SELECT id, user_id, user_name, request_type, status, data, comments, history,
           booking_result, assigned_to, created_at, updated_at
    FROM travel_requests
    WHERE id = $1
    FOR UPDATE
"#;

const LIST_REQUESTS: &str = r#"
    SELECT id, user_id, user_name, request_type, status, data, comments, history,
           booking_result, assigned_to, created_at, updated_at
    FROM travel_requests
    WHERE ($1::TEXT IS NULL OR user_id = $1)
    ORDER BY created_at DESC, id DESC
"#;

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .map(|code| code == UNIQUE_VIOLATION)
        .unwrap_or(false)
}

fn row_to_request(row: &PgRow) -> Result<TravelRequest, StoreError> {
    let request_type: String = row.try_get("request_type")?;
    let request_type: RequestType = request_type
        .parse()
        .map_err(|e: crate::db::models::ParseEnumError| StoreError::Decode(e.to_string()))?;
    let status: String = row.try_get("status")?;
    let status = status
        .parse()
        .map_err(|e: crate::db::models::ParseEnumError| StoreError::Decode(e.to_string()))?;

    let Json(data): Json<Value> = row.try_get("data")?;
    let Json(comments): Json<Vec<Comment>> = row.try_get("comments")?;
    let Json(history): Json<Vec<AuditLogEntry>> = row.try_get("history")?;
    let booking_result: Option<Json<BookingResult>> = row.try_get("booking_result")?;

    Ok(TravelRequest {
        id: row.try_get("id")?,
        owner_id: row.try_get("user_id")?,
        owner_name: row.try_get("user_name")?,
        status,
        details: RequestDetails::from_value(request_type, data)?,
        assigned_to: row.try_get("assigned_to")?,
        booking_result: booking_result.map(|Json(result)| result),
        comments,
        history,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// ✅ **Travel requests in PostgreSQL.** Scalar columns plus JSONB documents for
/// `data`, `comments`, `history` and `booking_result`.
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn get(&self, id: &str) -> Result<TravelRequest, LifecycleError> {
        let row = sqlx::query(SELECT_REQUEST)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| LifecycleError::not_found(id))?;
        Ok(row_to_request(&row)?)
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<TravelRequest>, LifecycleError> {
        let rows = sqlx::query(LIST_REQUESTS)
            .bind(filter.owner_id.as_deref())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from)?;
        let requests = rows
            .iter()
            .map(row_to_request)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(requests)
    }

    async fn insert(&self, request: TravelRequest) -> Result<TravelRequest, LifecycleError> {
        let data = request.details.to_value().map_err(StoreError::from)?;
        sqlx::query(
            r#"
            INSERT INTO travel_requests
                (id, user_id, user_name, request_type, status, data, comments, history,
                 booking_result, assigned_to, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&request.id)
        .bind(&request.owner_id)
        .bind(&request.owner_name)
        .bind(request.request_type().as_str())
        .bind(request.status.as_str())
        .bind(Json(&data))
        .bind(Json(&request.comments))
        .bind(Json(&request.history))
        .bind(request.booking_result.as_ref().map(Json))
        .bind(&request.assigned_to)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("request `{}` already exists", request.id))
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(request)
    }

    async fn update(&self, id: &str, mutation: Mutation) -> Result<TravelRequest, LifecycleError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let row = sqlx::query(SELECT_REQUEST_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| LifecycleError::not_found(id))?;
        let mut draft = row_to_request(&row)?;

        // Dropping `tx` on a rejected mutation rolls the transaction back.
        mutation(&mut draft)?;

        let data = draft.details.to_value().map_err(StoreError::from)?;
        sqlx::query(
            r#"
            UPDATE travel_requests
            SET status = $2, assigned_to = $3, data = $4, comments = $5, history = $6,
                booking_result = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(draft.status.as_str())
        .bind(&draft.assigned_to)
        .bind(Json(&data))
        .bind(Json(&draft.comments))
        .bind(Json(&draft.history))
        .bind(draft.booking_result.as_ref().map(Json))
        .bind(draft.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(draft)
    }

    async fn delete(&self, id: &str, guard: DeleteGuard) -> Result<(), LifecycleError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from)?;

        let row = sqlx::query(SELECT_REQUEST_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from)?
            .ok_or_else(|| LifecycleError::not_found(id))?;
        guard(&row_to_request(&row)?)?;

        sqlx::query("DELETE FROM travel_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from)?;

        tx.commit().await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, LifecycleError> {
        let result = sqlx::query("DELETE FROM travel_requests WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_user(row: &PgRow) -> Result<User, StoreError> {
    let role: String = row.try_get("role")?;
    let role: Role = role
        .parse()
        .map_err(|e: crate::db::models::ParseEnumError| StoreError::Decode(e.to_string()))?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, role, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, role, password_hash, created_at
            FROM users
            WHERE email = $1 OR id = $1
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn insert(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("email `{}` is already registered", user.email))
            } else {
                StoreError::from(e)
            }
        })?;
        Ok(user)
    }

    async fn find_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT data FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let Json(profile): Json<UserProfile> = row.try_get("data")?;
        Ok(Some(profile))
    }

    async fn save_profile(
        &self,
        user_id: &str,
        profile: &UserProfile,
        name: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if let Some(name) = name {
            sqlx::query("UPDATE users SET name = $2 WHERE id = $1")
                .bind(user_id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, data, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(Json(profile))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
