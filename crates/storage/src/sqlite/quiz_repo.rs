use chrono::{DateTime, Utc};
use sqlx::Row;
use study_core::model::{QuizResult, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, from_doc, to_doc};
use crate::repository::{QuizResultRepository, StorageError};

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let doc: String = row.try_get("doc").map_err(db_err)?;
    from_doc(&doc)
}

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn insert_result(&self, result: &QuizResult) -> Result<(), StorageError> {
        let doc = to_doc(result)?;

        sqlx::query(
            r"
                INSERT INTO quiz_results (
                    id, user_id, material_id, completed_at, doc
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(result.id().to_string())
        .bind(result.user_id().as_str())
        .bind(result.material_id().as_str())
        .bind(result.completed_at())
        .bind(doc)
        .execute(self.pool())
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn list_results_since(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT doc FROM quiz_results
                WHERE user_id = ?1 AND completed_at >= ?2
                ORDER BY completed_at DESC, id DESC
            ",
        )
        .bind(user.as_str())
        .bind(from)
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_result_row(row)?);
        }
        Ok(out)
    }

    async fn list_recent_results(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT doc FROM quiz_results
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_result_row(row)?);
        }
        Ok(out)
    }
}
