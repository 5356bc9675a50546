//! Account queries

use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::Row;

use super::PostgresManager;
use crate::error::TrackerResult;
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     is_staff, is_superuser, is_active, date_joined, last_login";

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        is_staff: row.try_get("is_staff")?,
        is_superuser: row.try_get("is_superuser")?,
        is_active: row.try_get("is_active")?,
        date_joined: row.try_get("date_joined")?,
        last_login: row.try_get("last_login")?,
    })
}

impl PostgresManager {
    /// Insert an account whose flags have already been resolved
    pub async fn insert_user(&self, user: &NewUser, password_hash: &str) -> TrackerResult<User> {
        let query = format!(
            "INSERT INTO users (id, username, email, password_hash, first_name, last_name, \
             is_staff, is_superuser, is_active, date_joined) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(clickup_core::generate_id())
            .bind(&user.username)
            .bind(&user.email)
            .bind(password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.is_staff.unwrap_or(false))
            .bind(user.is_superuser.unwrap_or(false))
            .bind(user.is_active.unwrap_or(false))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(user_from_row(&row)?)
    }

    pub async fn get_user(&self, id: &str) -> TrackerResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> TrackerResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    pub async fn update_user_names(
        &self,
        id: &str,
        first_name: &str,
        last_name: &str,
    ) -> TrackerResult<()> {
        sqlx::query("UPDATE users SET first_name = $2, last_name = $3 WHERE id = $1")
            .bind(id)
            .bind(first_name)
            .bind(last_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn record_login(&self, id: &str) -> TrackerResult<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
