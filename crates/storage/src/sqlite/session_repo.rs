use chrono::{DateTime, Utc};
use sqlx::Row;
use study_core::model::{SessionId, StudySession, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, from_doc, to_doc};
use crate::repository::{StorageError, StudySessionRepository};

fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<StudySession, StorageError> {
    let doc: String = row.try_get("doc").map_err(db_err)?;
    from_doc(&doc)
}

#[async_trait::async_trait]
impl StudySessionRepository for SqliteRepository {
    async fn insert_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let doc = to_doc(session)?;

        sqlx::query(
            r"
                INSERT INTO study_sessions (
                    id, user_id, material_id, started_at, completed, doc
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(session.id().to_string())
        .bind(session.user_id().as_str())
        .bind(session.material_id().as_str())
        .bind(session.started_at())
        .bind(session.is_completed())
        .bind(doc)
        .execute(self.pool())
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<StudySession>, StorageError> {
        let row = sqlx::query("SELECT doc FROM study_sessions WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let doc = to_doc(session)?;

        let res = sqlx::query(
            r"
                UPDATE study_sessions
                SET completed = ?2, doc = ?3
                WHERE id = ?1
            ",
        )
        .bind(session.id().to_string())
        .bind(session.is_completed())
        .bind(doc)
        .execute(self.pool())
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sessions_since(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
    ) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT doc FROM study_sessions
                WHERE user_id = ?1 AND started_at >= ?2
                ORDER BY started_at DESC, id DESC
            ",
        )
        .bind(user.as_str())
        .bind(from)
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_session_row(row)?);
        }
        Ok(out)
    }
}
