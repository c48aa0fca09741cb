//! Batch/test assignment: eligibility, attach/detach, and the edit-time
//! rebuild. This is the only part of the tracker with nontrivial rules —
//! everything else is plain CRUD.

use serde::Serialize;
use tracing::warn;

use labtrack_core::{ServiceError, WriteAccess, now_rfc3339};
use labtrack_sql::{Statement, Value};

use super::LimsService;
use crate::model::{Batch, Pipet, Test};

/// Everything the edit screen needs for one batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEditView {
    pub batch: Batch,

    /// Tests currently attached to the batch.
    pub tests: Vec<Test>,

    /// Eligible tests offered for additional attachment. Empty when the
    /// batch was just auto-populated.
    pub candidates: Vec<Test>,

    /// Pipet ids that were attached before the edit-time reset.
    pub selected_pipet_ids: Vec<String>,

    /// Full pipet list offered for reselection.
    pub pipets: Vec<Pipet>,
}

/// The attach UPDATE carries the compatibility check in its WHERE clause:
/// the row is only written when the test's method matches the batch's, so
/// check and write cannot interleave. Column values and the JSON document
/// move together.
const ATTACH_SQL: &str = "UPDATE tests SET \
     batch_id = ?1, \
     batched = 1, \
     data = json_set(data, '$.batchId', ?1, '$.batched', json('true'), '$.updateAt', ?2), \
     update_at = ?2 \
     WHERE id = ?3 \
     AND test_method_id = (SELECT test_method_id FROM batches WHERE id = ?4)";

const DETACH_SQL: &str = "UPDATE tests SET \
     batch_id = NULL, \
     batched = 0, \
     data = json_set(data, '$.batchId', json('null'), '$.batched', json('false'), '$.updateAt', ?1), \
     update_at = ?1 \
     WHERE id = ?2";

impl LimsService {
    /// Tests available to join a batch of the given method: matching
    /// method AND (unbatched OR carrying no batch reference).
    ///
    /// The disjunction is deliberate — legacy rows can show the two flags
    /// disagreeing, and either staleness shape counts as available.
    pub fn eligible_tests(&self, test_method_id: &str) -> Result<Vec<Test>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT data FROM tests \
                 WHERE test_method_id = ?1 AND (batched = 0 OR batch_id IS NULL) \
                 ORDER BY create_at ASC",
                &[Value::Text(test_method_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut tests = Vec::new();
        for row in &rows {
            let data = row.get_str("data")
                .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
            let test: Test = serde_json::from_str(data)
                .map_err(|e| ServiceError::Internal(e.to_string()))?;
            if test.batched != test.batch_id.is_some() {
                // Data-integrity smell, observed in legacy imports. Not repaired.
                warn!(
                    test_id = %test.id,
                    batched = test.batched,
                    batch_id = ?test.batch_id,
                    "test flags disagree; treating as available"
                );
            }
            tests.push(test);
        }
        Ok(tests)
    }

    /// Tests attached to a batch.
    pub fn attached_tests(&self, batch_id: &str) -> Result<Vec<Test>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT data FROM tests WHERE batch_id = ?1 ORDER BY create_at ASC",
                &[Value::Text(batch_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let data = row.get_str("data")
                    .ok_or_else(|| ServiceError::Internal("missing data column".into()))?;
                serde_json::from_str(data).map_err(|e| ServiceError::Internal(e.to_string()))
            })
            .collect()
    }

    /// Attach a test to a batch. Fails with `IncompatibleMethod` when the
    /// test's method differs from the batch's; the test is left untouched.
    pub fn attach_test(
        &self,
        _access: &WriteAccess,
        batch_id: &str,
        test_id: &str,
    ) -> Result<Test, ServiceError> {
        let batch: Batch = self.get_batch(batch_id)?;
        let test: Test = self.get_test(test_id)?;

        let affected = self.sql
            .exec(
                ATTACH_SQL,
                &[
                    Value::Text(batch_id.to_string()),
                    Value::Text(now_rfc3339()),
                    Value::Text(test_id.to_string()),
                    Value::Text(batch_id.to_string()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::IncompatibleMethod(format!(
                "test {} uses method {}, batch {} expects {}",
                test.id, test.test_method_id, batch.id, batch.test_method_id
            )));
        }

        self.get_test(test_id)
    }

    /// Detach a test from a batch, clearing both assignment fields.
    /// Idempotent: detaching an already-detached test is a no-op success.
    pub fn detach_test(
        &self,
        _access: &WriteAccess,
        batch_id: &str,
        test_id: &str,
    ) -> Result<Test, ServiceError> {
        let _batch: Batch = self.get_batch(batch_id)?;

        let affected = self.sql
            .exec(
                DETACH_SQL,
                &[Value::Text(now_rfc3339()), Value::Text(test_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("tests/{}", test_id)));
        }

        self.get_test(test_id)
    }

    /// Open a batch for editing.
    ///
    /// A batch with attached tests keeps them and gets the eligible pool
    /// as candidates; an empty batch is auto-populated with every eligible
    /// test in one transaction. Either way the pipet join is reset: the
    /// prior selection is captured as ids, the join rows are cleared, and
    /// the full pipet list is returned for reselection. The auto-populate
    /// branch runs at most once per batch — afterwards the batch is no
    /// longer empty.
    pub fn open_for_edit(
        &self,
        access: &WriteAccess,
        batch_id: &str,
    ) -> Result<BatchEditView, ServiceError> {
        let batch: Batch = self.get_batch(batch_id)?;

        let selected_pipet_ids = self.batch_pipet_ids(batch_id)?;
        self.sql
            .exec(
                "DELETE FROM batch_pipets WHERE batch_id = ?1",
                &[Value::Text(batch_id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        let mut tests = self.attached_tests(batch_id)?;
        let candidates = if tests.is_empty() {
            let eligible = self.eligible_tests(&batch.test_method_id)?;
            self.attach_all(access, batch_id, &eligible)?;
            tests = self.attached_tests(batch_id)?;
            Vec::new()
        } else {
            self.eligible_tests(&batch.test_method_id)?
        };

        Ok(BatchEditView {
            batch,
            tests,
            candidates,
            selected_pipet_ids,
            pipets: self.all_pipets()?,
        })
    }

    /// Bulk attach inside one transaction (the auto-populate branch).
    fn attach_all(
        &self,
        _access: &WriteAccess,
        batch_id: &str,
        tests: &[Test],
    ) -> Result<(), ServiceError> {
        if tests.is_empty() {
            return Ok(());
        }

        let now = now_rfc3339();
        let statements: Vec<Statement> = tests
            .iter()
            .map(|t| {
                Statement::new(
                    ATTACH_SQL,
                    vec![
                        Value::Text(batch_id.to_string()),
                        Value::Text(now.clone()),
                        Value::Text(t.id.clone()),
                        Value::Text(batch_id.to_string()),
                    ],
                )
            })
            .collect();

        self.sql
            .exec_transaction(&statements)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }
}
