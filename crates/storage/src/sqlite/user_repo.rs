use sqlx::Row;
use study_core::model::{User, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, from_doc, to_doc};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query("SELECT doc FROM users WHERE user_id = ?1")
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => {
                let doc: String = row.try_get("doc").map_err(db_err)?;
                Ok(Some(from_doc(&doc)?))
            }
            None => Ok(None),
        }
    }

    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let doc = to_doc(user)?;

        sqlx::query(
            r"
                INSERT INTO users (user_id, updated_at, doc)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    doc = excluded.doc
            ",
        )
        .bind(user.id.as_str())
        .bind(user.updated_at)
        .bind(doc)
        .execute(self.pool())
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
