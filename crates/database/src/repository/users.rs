use chrono::{DateTime, Utc};
use core_types::{NewUser, User};
use sqlx::FromRow;
use sqlx::postgres::PgConnection;
use uuid::Uuid;

use crate::error::DbError;

pub(crate) const USER_COLUMNS: &str = "id, email, full_name, created_at";

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            created_at: row.created_at,
        }
    }
}

pub struct UserRepository;

impl UserRepository {
    pub async fn create(conn: &mut PgConnection, user: &NewUser) -> Result<User, DbError> {
        let sql = format!(
            "INSERT INTO users (email, full_name) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&user.email)
            .bind(&user.full_name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row.into())
    }

    pub async fn get(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(User::from))
    }

    /// Deletes a user together with their rides, bookings and reviews (written
    /// and received). Returns whether a row was removed.
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
