use sqlx::Row;
use study_core::model::{MaterialId, Schedule, ScheduleId, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, from_doc, to_doc};
use crate::repository::{ScheduleRepository, StorageError};

fn map_schedule_row(row: &sqlx::sqlite::SqliteRow) -> Result<Schedule, StorageError> {
    let doc: String = row.try_get("doc").map_err(db_err)?;
    from_doc(&doc)
}

#[async_trait::async_trait]
impl ScheduleRepository for SqliteRepository {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<(), StorageError> {
        let doc = to_doc(schedule)?;

        sqlx::query(
            r"
                INSERT INTO schedules (
                    id, user_id, material_id, active, started_at, doc
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(schedule.id().to_string())
        .bind(schedule.user_id().as_str())
        .bind(schedule.material_id().as_str())
        .bind(schedule.is_active())
        .bind(schedule.started_at())
        .bind(doc)
        .execute(self.pool())
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>, StorageError> {
        let row = sqlx::query("SELECT doc FROM schedules WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_schedule_row).transpose()
    }

    async fn update_schedule(&self, schedule: &Schedule) -> Result<(), StorageError> {
        let doc = to_doc(schedule)?;

        let res = sqlx::query(
            r"
                UPDATE schedules
                SET active = ?2, doc = ?3
                WHERE id = ?1
            ",
        )
        .bind(schedule.id().to_string())
        .bind(schedule.is_active())
        .bind(doc)
        .execute(self.pool())
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_active_schedules(&self, user: &UserId) -> Result<Vec<Schedule>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT doc FROM schedules
                WHERE user_id = ?1 AND active = 1
                ORDER BY started_at DESC, id DESC
            ",
        )
        .bind(user.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(map_schedule_row(row)?);
        }
        Ok(out)
    }

    async fn find_active_for_material(
        &self,
        user: &UserId,
        material: &MaterialId,
    ) -> Result<Option<Schedule>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT doc FROM schedules
                WHERE user_id = ?1 AND material_id = ?2 AND active = 1
                ORDER BY started_at DESC, id DESC
                LIMIT 1
            ",
        )
        .bind(user.as_str())
        .bind(material.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_schedule_row).transpose()
    }

    async fn deactivate_for_material(
        &self,
        user: &UserId,
        material: &MaterialId,
    ) -> Result<u64, StorageError> {
        // Read-modify-write so the JSON document stays in step with the
        // indexed active column.
        let actives = sqlx::query(
            r"
                SELECT doc FROM schedules
                WHERE user_id = ?1 AND material_id = ?2 AND active = 1
            ",
        )
        .bind(user.as_str())
        .bind(material.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let mut touched = 0;
        for row in &actives {
            let mut schedule = map_schedule_row(row)?;
            schedule.deactivate();
            self.update_schedule(&schedule).await?;
            touched += 1;
        }
        Ok(touched)
    }
}
