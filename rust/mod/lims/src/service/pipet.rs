use serde::Deserialize;

use labtrack_core::{ListParams, ListResult, ServiceError, WriteAccess, new_id, now_rfc3339};
use labtrack_sql::{Statement, Value};

use super::LimsService;
use crate::model::{Batch, Pipet};

/// Pipet create payload. Every field is required; options exist so that
/// validation can name each missing field instead of failing on the first.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePipetInput {
    pub calibration_date: Option<String>,
    pub calibration_due: Option<String>,
    pub max_volume: Option<i64>,
    pub min_volume: Option<i64>,
    pub adjustable: Option<bool>,
}

impl CreatePipetInput {
    /// Check required fields and ranges, collecting every violation.
    fn validate(&self) -> Result<(), ServiceError> {
        let mut problems = Vec::new();

        match self.calibration_date.as_deref() {
            None | Some("") => problems.push("calibration_date is required"),
            _ => {}
        }
        match self.calibration_due.as_deref() {
            None | Some("") => problems.push("calibration_due is required"),
            _ => {}
        }
        match self.max_volume {
            None => problems.push("max_volume is required"),
            Some(v) if v < 0 => problems.push("max_volume must be a non-negative integer"),
            _ => {}
        }
        match self.min_volume {
            None => problems.push("min_volume is required"),
            Some(v) if v < 0 => problems.push("min_volume must be a non-negative integer"),
            _ => {}
        }
        if self.adjustable.is_none() {
            problems.push("adjustable is required");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(problems.join("; ")))
        }
    }
}

impl LimsService {
    // ── Pipet ──

    pub fn create_pipet(
        &self,
        _access: &WriteAccess,
        input: CreatePipetInput,
    ) -> Result<Pipet, ServiceError> {
        input.validate()?;

        let id = new_id();
        let now = now_rfc3339();
        let record = Pipet {
            id: id.clone(),
            calibration_date: input.calibration_date.unwrap_or_default(),
            calibration_due: input.calibration_due.unwrap_or_default(),
            max_volume: input.max_volume.unwrap_or_default() as u32,
            min_volume: input.min_volume.unwrap_or_default() as u32,
            adjustable: input.adjustable.unwrap_or_default(),
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("pipets", &id, &record, &[
            ("calibration_due", Value::Text(record.calibration_due.clone())),
            ("adjustable", Value::Integer(record.adjustable as i64)),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn get_pipet(&self, id: &str) -> Result<Pipet, ServiceError> {
        self.get_record("pipets", id)
    }

    pub fn list_pipets(&self, params: &ListParams) -> Result<ListResult<Pipet>, ServiceError> {
        let limit = params.limit.min(500);
        self.list_records("pipets", &[], limit, params.offset)
    }

    /// Every pipet, oldest first — the reselection pool on batch edit.
    pub fn all_pipets(&self) -> Result<Vec<Pipet>, ServiceError> {
        let rows = self.sql
            .query("SELECT data FROM pipets ORDER BY create_at ASC", &[])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let data = row.get_str("data")
                    .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
            })
            .collect()
    }

    pub fn update_pipet(
        &self,
        _access: &WriteAccess,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Pipet, ServiceError> {
        let current: Pipet = self.get_record("pipets", id)?;
        let updated: Pipet = Self::apply_patch(&current, patch)?;

        if updated.calibration_date.is_empty() || updated.calibration_due.is_empty() {
            return Err(ServiceError::Validation(
                "calibration_date and calibration_due are required".into(),
            ));
        }

        self.update_record("pipets", id, &updated, &[
            ("calibration_due", Value::Text(updated.calibration_due.clone())),
            ("adjustable", Value::Integer(updated.adjustable as i64)),
            ("update_at", Value::Text(updated.update_at.clone().unwrap_or_default())),
        ])?;

        Ok(updated)
    }

    /// Delete a pipet and its join rows. Batches keep working — the join
    /// carries no ownership.
    pub fn delete_pipet(&self, _access: &WriteAccess, id: &str) -> Result<(), ServiceError> {
        let _pipet: Pipet = self.get_record("pipets", id)?;

        self.sql
            .exec_transaction(&[
                Statement::new(
                    "DELETE FROM batch_pipets WHERE pipet_id = ?1",
                    vec![Value::Text(id.to_string())],
                ),
                Statement::new(
                    "DELETE FROM pipets WHERE id = ?1",
                    vec![Value::Text(id.to_string())],
                ),
            ])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(())
    }

    // ── Batch/pipet join ──

    /// Pipet ids attached to a batch.
    pub fn batch_pipet_ids(&self, batch_id: &str) -> Result<Vec<String>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT pipet_id FROM batch_pipets WHERE batch_id = ?1 ORDER BY pipet_id ASC",
                &[Value::Text(batch_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows
            .iter()
            .filter_map(|r| r.get_str("pipet_id").map(String::from))
            .collect())
    }

    /// Replace a batch's pipet selection. Unknown pipet ids fail the whole
    /// call; nothing is written.
    pub fn set_batch_pipets(
        &self,
        _access: &WriteAccess,
        batch_id: &str,
        pipet_ids: &[String],
    ) -> Result<Vec<String>, ServiceError> {
        let _batch: Batch = self.get_record("batches", batch_id)?;
        for id in pipet_ids {
            let _pipet: Pipet = self.get_record("pipets", id)?;
        }

        let mut statements = vec![Statement::new(
            "DELETE FROM batch_pipets WHERE batch_id = ?1",
            vec![Value::Text(batch_id.to_string())],
        )];
        for id in pipet_ids {
            statements.push(Statement::new(
                "INSERT OR IGNORE INTO batch_pipets (batch_id, pipet_id) VALUES (?1, ?2)",
                vec![Value::Text(batch_id.to_string()), Value::Text(id.clone())],
            ));
        }

        self.sql
            .exec_transaction(&statements)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        self.batch_pipet_ids(batch_id)
    }
}

#[cfg(test)]
mod tests {
    use labtrack_core::{Role, require_write};
    use labtrack_sql::SqliteStore;

    use super::*;
    use crate::service::batch::CreateBatchInput;

    fn test_service() -> LimsService {
        let sql = Box::new(SqliteStore::open_in_memory().unwrap());
        LimsService::new(sql).unwrap()
    }

    fn access() -> WriteAccess {
        require_write(Role::Analyst).unwrap()
    }

    fn valid_input() -> CreatePipetInput {
        CreatePipetInput {
            calibration_date: Some("2026-01-15".into()),
            calibration_due: Some("2027-01-15".into()),
            max_volume: Some(1000),
            min_volume: Some(100),
            adjustable: Some(true),
        }
    }

    #[test]
    fn pipet_crud() {
        let svc = test_service();

        let pipet = svc.create_pipet(&access(), valid_input()).unwrap();
        assert_eq!(pipet.max_volume, 1000);
        assert!(pipet.adjustable);

        let fetched = svc.get_pipet(&pipet.id).unwrap();
        assert_eq!(fetched, pipet);

        let updated = svc
            .update_pipet(&access(), &pipet.id, serde_json::json!({"maxVolume": 5000}))
            .unwrap();
        assert_eq!(updated.max_volume, 5000);

        let list = svc.list_pipets(&ListParams::default()).unwrap();
        assert_eq!(list.total, 1);

        svc.delete_pipet(&access(), &pipet.id).unwrap();
        assert!(svc.get_pipet(&pipet.id).is_err());
    }

    #[test]
    fn missing_fields_reported_together() {
        let svc = test_service();
        let err = svc
            .create_pipet(&access(), CreatePipetInput {
                calibration_date: None,
                calibration_due: Some("".into()),
                max_volume: Some(1000),
                min_volume: None,
                adjustable: None,
            })
            .unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        let msg = err.to_string();
        assert!(msg.contains("calibration_date"));
        assert!(msg.contains("calibration_due"));
        assert!(msg.contains("min_volume"));
        assert!(msg.contains("adjustable"));
        assert!(!msg.contains("max_volume"));

        // Nothing persisted.
        assert_eq!(svc.list_pipets(&ListParams::default()).unwrap().total, 0);
    }

    #[test]
    fn negative_volume_rejected() {
        let svc = test_service();
        let err = svc
            .create_pipet(&access(), CreatePipetInput {
                min_volume: Some(-5),
                ..valid_input()
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(err.to_string().contains("min_volume"));
    }

    #[test]
    fn update_cannot_clear_calibration() {
        let svc = test_service();
        let pipet = svc.create_pipet(&access(), valid_input()).unwrap();

        let err = svc
            .update_pipet(&access(), &pipet.id, serde_json::json!({"calibrationDue": ""}))
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn join_replacement() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let batch = svc
            .create_batch(&access(), CreateBatchInput {
                test_method_id: method.id.clone(),
            })
            .unwrap();
        let p1 = svc.create_pipet(&access(), valid_input()).unwrap();
        let p2 = svc.create_pipet(&access(), valid_input()).unwrap();

        let ids = svc
            .set_batch_pipets(&access(), &batch.id, &[p1.id.clone(), p2.id.clone()])
            .unwrap();
        assert_eq!(ids.len(), 2);

        let ids = svc.set_batch_pipets(&access(), &batch.id, &[p2.id.clone()]).unwrap();
        assert_eq!(ids, vec![p2.id.clone()]);
    }

    #[test]
    fn join_rejects_unknown_pipet() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let batch = svc
            .create_batch(&access(), CreateBatchInput {
                test_method_id: method.id.clone(),
            })
            .unwrap();
        let p1 = svc.create_pipet(&access(), valid_input()).unwrap();

        let err = svc
            .set_batch_pipets(&access(), &batch.id, &[p1.id.clone(), "nope".into()])
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        // Nothing written.
        assert!(svc.batch_pipet_ids(&batch.id).unwrap().is_empty());
    }

    #[test]
    fn delete_pipet_clears_joins_only() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let batch = svc
            .create_batch(&access(), CreateBatchInput {
                test_method_id: method.id.clone(),
            })
            .unwrap();
        let p1 = svc.create_pipet(&access(), valid_input()).unwrap();
        svc.set_batch_pipets(&access(), &batch.id, &[p1.id.clone()]).unwrap();

        svc.delete_pipet(&access(), &p1.id).unwrap();
        assert!(svc.batch_pipet_ids(&batch.id).unwrap().is_empty());
        assert!(svc.get_batch(&batch.id).is_ok());
    }
}
