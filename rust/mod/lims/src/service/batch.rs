use serde::Serialize;

use labtrack_core::{ListParams, ListResult, ServiceError, WriteAccess, new_id, now_rfc3339};
use labtrack_sql::{Statement, Value};

use super::LimsService;
use crate::model::{Batch, TestMethod};

pub struct CreateBatchInput {
    pub test_method_id: String,
}

#[derive(Debug, Default)]
pub struct BatchFilters {
    pub test_method_id: Option<String>,
}

/// A `(name, id)` pair offered when creating a new batch.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MethodOption {
    pub id: String,
    pub name: String,
}

impl LimsService {
    // ── Batch ──

    pub fn create_batch(
        &self,
        _access: &WriteAccess,
        input: CreateBatchInput,
    ) -> Result<Batch, ServiceError> {
        // Validate the method exists
        let _method: TestMethod = self.get_record("test_methods", &input.test_method_id)?;

        let id = new_id();
        let now = now_rfc3339();
        let record = Batch {
            id: id.clone(),
            test_method_id: input.test_method_id.clone(),
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("batches", &id, &record, &[
            ("test_method_id", Value::Text(input.test_method_id)),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn get_batch(&self, id: &str) -> Result<Batch, ServiceError> {
        self.get_record("batches", id)
    }

    pub fn list_batches(
        &self,
        params: &ListParams,
        filters: &BatchFilters,
    ) -> Result<ListResult<Batch>, ServiceError> {
        let limit = params.limit.min(500);
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref m) = filters.test_method_id {
            f.push(("test_method_id", Value::Text(m.clone())));
        }
        self.list_records("batches", &f, limit, params.offset)
    }

    pub fn update_batch(
        &self,
        _access: &WriteAccess,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Batch, ServiceError> {
        let current: Batch = self.get_record("batches", id)?;
        let updated: Batch = Self::apply_patch(&current, patch)?;

        // A method change must point at a real method.
        let _method: TestMethod = self.get_record("test_methods", &updated.test_method_id)?;

        self.update_record("batches", id, &updated, &[
            ("test_method_id", Value::Text(updated.test_method_id.clone())),
            ("update_at", Value::Text(updated.update_at.clone().unwrap_or_default())),
        ])?;

        Ok(updated)
    }

    /// Delete a batch: detach its tests, drop its pipet join rows, remove
    /// the batch record — all in one transaction. Pipet and test records
    /// themselves survive.
    pub fn delete_batch(&self, _access: &WriteAccess, id: &str) -> Result<(), ServiceError> {
        let _batch: Batch = self.get_record("batches", id)?;
        let now = now_rfc3339();

        self.sql
            .exec_transaction(&[
                Statement::new(
                    "UPDATE tests SET batch_id = NULL, batched = 0, \
                     data = json_set(data, '$.batchId', json('null'), '$.batched', json('false'), '$.updateAt', ?1), \
                     update_at = ?1 \
                     WHERE batch_id = ?2",
                    vec![Value::Text(now), Value::Text(id.to_string())],
                ),
                Statement::new(
                    "DELETE FROM batch_pipets WHERE batch_id = ?1",
                    vec![Value::Text(id.to_string())],
                ),
                Statement::new(
                    "DELETE FROM batches WHERE id = ?1",
                    vec![Value::Text(id.to_string())],
                ),
            ])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Methods that currently have at least one eligible test — the
    /// options offered when creating a new batch.
    pub fn available_methods(&self) -> Result<Vec<MethodOption>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT DISTINCT m.id AS id, m.name AS name \
                 FROM test_methods m \
                 JOIN tests t ON t.test_method_id = m.id \
                 WHERE t.batched = 0 OR t.batch_id IS NULL \
                 ORDER BY m.name ASC",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let id = row.get_str("id")?;
                let name = row.get_str("name")?;
                Some(MethodOption {
                    id: id.to_string(),
                    name: name.to_string(),
                })
            })
            .collect())
    }

    /// Display label for a batch's pipets, e.g. "P3fa2, P9c01".
    pub fn batch_pipet_label(&self, batch_id: &str) -> Result<String, ServiceError> {
        let _batch: Batch = self.get_record("batches", batch_id)?;
        let ids = self.batch_pipet_ids(batch_id)?;
        Ok(ids
            .iter()
            .map(|id| format!("P{}", &id[..id.len().min(4)]))
            .collect::<Vec<_>>()
            .join(", "))
    }
}
