//! Portal user database operations

use super::AppState;
use crate::auth::model::{User, UserRole};

const USER_COLUMNS: &str = "id, name, email, role, carrier_id, password_hash";

impl AppState {
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY name",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Update a user's role and carrier binding. Returns the updated user,
    /// or None when the id does not exist.
    pub async fn update_user_config(
        &self,
        id: &str,
        role: UserRole,
        carrier_id: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $1, carrier_id = $2 WHERE id = $3 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(role.as_str())
        .bind(carrier_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
