//! User rows.  Deleting a user cascades to all of their progress records.

use chrono::{DateTime, Utc};
use lexcards_shared::UserId;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    /// Insert a new user and return it with its assigned id.
    pub fn create_user(&self, name: &str) -> Result<User> {
        let now = Utc::now();
        let id: i64 = self.bounded(|conn| {
            Ok(conn.query_row(
                "INSERT INTO users (name, created_at) VALUES (?1, ?2) RETURNING id",
                params![name, now.to_rfc3339()],
                |row| row.get(0),
            )?)
        })?;

        tracing::debug!(user_id = id, "created user");

        Ok(User {
            id: UserId(id),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Fetch a single user.
    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.bounded(|conn| {
            conn.query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                params![id.0],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::from(other),
            })
        })
    }

    /// Delete a user and, through the foreign key, every progress record
    /// they own.
    pub fn delete_user(&self, id: UserId) -> Result<()> {
        let affected = self.bounded(|conn| {
            Ok(conn.execute("DELETE FROM users WHERE id = ?1", params![id.0])?)
        })?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        tracing::debug!(user_id = %id, "deleted user");
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let created_str: String = row.get(2)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id: UserId(id),
        name,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::open_temp;
    use crate::StoreError;

    #[test]
    fn create_get_delete() {
        let (_dir, db) = open_temp();

        let user = db.create_user("aoife").unwrap();
        assert_eq!(db.get_user(user.id).unwrap(), user);

        db.delete_user(user.id).unwrap();
        assert!(matches!(db.get_user(user.id), Err(StoreError::NotFound)));
        assert!(matches!(db.delete_user(user.id), Err(StoreError::NotFound)));
    }
}
