//! TestMethod, Sample and Test CRUD, including the nested test rows a
//! sample form submits in one save.

use serde::Deserialize;

use labtrack_core::{ListParams, ListResult, ServiceError, WriteAccess, new_id, now_rfc3339};
use labtrack_sql::{Statement, Value};

use super::LimsService;
use crate::model::{Sample, Test, TestMethod};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSampleInput {
    pub name: String,
    #[serde(default)]
    pub lot: String,
    #[serde(default)]
    pub project_id: Option<String>,
    /// Test rows submitted with the sample; only `create` ops are
    /// meaningful here.
    #[serde(default)]
    pub tests: Vec<NestedTest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestInput {
    pub test_method_id: String,
    pub sample_id: String,
}

#[derive(Debug, Default)]
pub struct TestFilters {
    pub test_method_id: Option<String>,
    pub batch_id: Option<String>,
}

/// What to do with one nested test row on save.
///
/// The client marks rows instead of issuing per-row requests; the
/// persistence boundary interprets the marks in one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestedOp {
    #[default]
    Unchanged,
    Create,
    Delete,
}

/// One nested test row in a sample save.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedTest {
    #[serde(default)]
    pub op: NestedOp,

    /// Existing test id; required for `delete`.
    #[serde(default)]
    pub id: Option<String>,

    /// Method for a new test; required for `create`.
    #[serde(default)]
    pub test_method_id: Option<String>,
}

impl LimsService {
    // ── TestMethod ──

    pub fn create_method(
        &self,
        _access: &WriteAccess,
        name: &str,
    ) -> Result<TestMethod, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("method name is required".into()));
        }

        let id = new_id();
        let now = now_rfc3339();
        let record = TestMethod {
            id: id.clone(),
            name: name.to_string(),
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("test_methods", &id, &record, &[
            ("name", Value::Text(name.to_string())),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn get_method(&self, id: &str) -> Result<TestMethod, ServiceError> {
        self.get_record("test_methods", id)
    }

    pub fn list_methods(&self, params: &ListParams) -> Result<ListResult<TestMethod>, ServiceError> {
        let limit = params.limit.min(500);
        self.list_records("test_methods", &[], limit, params.offset)
    }

    /// Delete a method. Refused while tests or batches still reference it.
    pub fn delete_method(&self, _access: &WriteAccess, id: &str) -> Result<(), ServiceError> {
        let _method: TestMethod = self.get_record("test_methods", id)?;

        let tests = self.count_records("tests", &[("test_method_id", Value::Text(id.to_string()))])?;
        let batches = self.count_records("batches", &[("test_method_id", Value::Text(id.to_string()))])?;
        if tests > 0 || batches > 0 {
            return Err(ServiceError::Conflict(format!(
                "method {} is referenced by {} test(s) and {} batch(es)",
                id, tests, batches
            )));
        }

        self.delete_record("test_methods", id)
    }

    // ── Sample ──

    pub fn create_sample(
        &self,
        access: &WriteAccess,
        input: CreateSampleInput,
    ) -> Result<Sample, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation("sample name is required".into()));
        }

        let id = new_id();
        let now = now_rfc3339();
        let record = Sample {
            id: id.clone(),
            name: input.name.clone(),
            lot: input.lot.clone(),
            project_id: input.project_id.clone(),
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("samples", &id, &record, &[
            ("name", Value::Text(input.name)),
            ("project_id", match input.project_id {
                Some(p) => Value::Text(p),
                None => Value::Null,
            }),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        if !input.tests.is_empty() {
            self.save_sample_tests(access, &id, &input.tests)?;
        }

        Ok(record)
    }

    pub fn get_sample(&self, id: &str) -> Result<Sample, ServiceError> {
        self.get_record("samples", id)
    }

    pub fn list_samples(&self, params: &ListParams) -> Result<ListResult<Sample>, ServiceError> {
        let limit = params.limit.min(500);
        self.list_records("samples", &[], limit, params.offset)
    }

    pub fn update_sample(
        &self,
        _access: &WriteAccess,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Sample, ServiceError> {
        let current: Sample = self.get_record("samples", id)?;
        let updated: Sample = Self::apply_patch(&current, patch)?;

        self.update_record("samples", id, &updated, &[
            ("name", Value::Text(updated.name.clone())),
            ("project_id", match updated.project_id.clone() {
                Some(p) => Value::Text(p),
                None => Value::Null,
            }),
            ("update_at", Value::Text(updated.update_at.clone().unwrap_or_default())),
        ])?;

        Ok(updated)
    }

    /// Delete a sample together with its tests.
    pub fn delete_sample(&self, _access: &WriteAccess, id: &str) -> Result<(), ServiceError> {
        let _sample: Sample = self.get_record("samples", id)?;

        self.sql
            .exec_transaction(&[
                Statement::new(
                    "DELETE FROM tests WHERE sample_id = ?1",
                    vec![Value::Text(id.to_string())],
                ),
                Statement::new(
                    "DELETE FROM samples WHERE id = ?1",
                    vec![Value::Text(id.to_string())],
                ),
            ])
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Interpret nested test rows for one sample in one transaction:
    /// `create` inserts, `delete` removes, `unchanged` is skipped.
    /// Returns the sample's tests as they stand afterwards.
    pub fn save_sample_tests(
        &self,
        _access: &WriteAccess,
        sample_id: &str,
        rows: &[NestedTest],
    ) -> Result<Vec<Test>, ServiceError> {
        let _sample: Sample = self.get_record("samples", sample_id)?;

        let mut statements = Vec::new();
        for row in rows {
            match row.op {
                NestedOp::Unchanged => {}
                NestedOp::Create => {
                    let method_id = row.test_method_id.as_deref().ok_or_else(|| {
                        ServiceError::Validation("nested create needs testMethodId".into())
                    })?;
                    let _method: TestMethod = self.get_record("test_methods", method_id)?;

                    let test = Test {
                        id: new_id(),
                        test_method_id: method_id.to_string(),
                        sample_id: sample_id.to_string(),
                        batched: false,
                        batch_id: None,
                        create_at: Some(now_rfc3339()),
                        update_at: Some(now_rfc3339()),
                    };
                    let json = serde_json::to_string(&test)
                        .map_err(|e| ServiceError::Internal(e.to_string()))?;
                    statements.push(Statement::new(
                        "INSERT INTO tests (id, data, test_method_id, sample_id, batched, batch_id, create_at, update_at) \
                         VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, ?5)",
                        vec![
                            Value::Text(test.id.clone()),
                            Value::Text(json),
                            Value::Text(test.test_method_id.clone()),
                            Value::Text(sample_id.to_string()),
                            Value::Text(test.create_at.clone().unwrap_or_default()),
                        ],
                    ));
                }
                NestedOp::Delete => {
                    let test_id = row.id.as_deref().ok_or_else(|| {
                        ServiceError::Validation("nested delete needs id".into())
                    })?;
                    statements.push(Statement::new(
                        "DELETE FROM tests WHERE id = ?1 AND sample_id = ?2",
                        vec![Value::Text(test_id.to_string()), Value::Text(sample_id.to_string())],
                    ));
                }
            }
        }

        if !statements.is_empty() {
            self.sql
                .exec_transaction(&statements)
                .map_err(|e| ServiceError::Storage(e.to_string()))?;
        }

        self.sample_tests(sample_id)
    }

    /// Tests belonging to a sample.
    pub fn sample_tests(&self, sample_id: &str) -> Result<Vec<Test>, ServiceError> {
        let rows = self.sql
            .query(
                "SELECT data FROM tests WHERE sample_id = ?1 ORDER BY create_at ASC",
                &[Value::Text(sample_id.to_string())],
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

    // ── Test ──

    pub fn create_test(
        &self,
        _access: &WriteAccess,
        input: CreateTestInput,
    ) -> Result<Test, ServiceError> {
        let _method: TestMethod = self.get_record("test_methods", &input.test_method_id)?;
        let _sample: Sample = self.get_record("samples", &input.sample_id)?;

        let id = new_id();
        let now = now_rfc3339();
        let record = Test {
            id: id.clone(),
            test_method_id: input.test_method_id.clone(),
            sample_id: input.sample_id.clone(),
            batched: false,
            batch_id: None,
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("tests", &id, &record, &[
            ("test_method_id", Value::Text(input.test_method_id)),
            ("sample_id", Value::Text(input.sample_id)),
            ("batched", Value::Integer(0)),
            ("batch_id", Value::Null),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn get_test(&self, id: &str) -> Result<Test, ServiceError> {
        self.get_record("tests", id)
    }

    pub fn list_tests(
        &self,
        params: &ListParams,
        filters: &TestFilters,
    ) -> Result<ListResult<Test>, ServiceError> {
        let limit = params.limit.min(500);
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref m) = filters.test_method_id {
            f.push(("test_method_id", Value::Text(m.clone())));
        }
        if let Some(ref b) = filters.batch_id {
            f.push(("batch_id", Value::Text(b.clone())));
        }
        self.list_records("tests", &f, limit, params.offset)
    }

    pub fn delete_test(&self, _access: &WriteAccess, id: &str) -> Result<(), ServiceError> {
        self.delete_record("tests", id)
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

    fn plain_sample(svc: &LimsService) -> Sample {
        svc.create_sample(&access(), CreateSampleInput {
            name: "sample".into(),
            lot: "L-100".into(),
            project_id: None,
            tests: vec![],
        })
        .unwrap()
    }

    #[test]
    fn method_names_are_unique() {
        let svc = test_service();
        svc.create_method(&access(), "ICP-MS").unwrap();
        let err = svc.create_method(&access(), "ICP-MS").unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");
    }

    #[test]
    fn method_name_required() {
        let svc = test_service();
        let err = svc.create_method(&access(), "  ").unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn method_delete_refused_while_referenced() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let sample = plain_sample(&svc);
        svc.create_test(&access(), CreateTestInput {
            test_method_id: method.id.clone(),
            sample_id: sample.id.clone(),
        })
        .unwrap();

        let err = svc.delete_method(&access(), &method.id).unwrap_err();
        assert_eq!(err.error_code(), "ALREADY_EXISTS");

        let unused = svc.create_method(&access(), "GC-FID").unwrap();
        svc.delete_method(&access(), &unused.id).unwrap();
    }

    #[test]
    fn create_test_checks_references() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let sample = plain_sample(&svc);

        let err = svc
            .create_test(&access(), CreateTestInput {
                test_method_id: "nope".into(),
                sample_id: sample.id.clone(),
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");

        let err = svc
            .create_test(&access(), CreateTestInput {
                test_method_id: method.id.clone(),
                sample_id: "nope".into(),
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn sample_with_nested_creates() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();

        let sample = svc
            .create_sample(&access(), CreateSampleInput {
                name: "tablet".into(),
                lot: "L-7".into(),
                project_id: None,
                tests: vec![
                    NestedTest {
                        op: NestedOp::Create,
                        id: None,
                        test_method_id: Some(method.id.clone()),
                    },
                    NestedTest {
                        op: NestedOp::Create,
                        id: None,
                        test_method_id: Some(method.id.clone()),
                    },
                ],
            })
            .unwrap();

        assert_eq!(svc.sample_tests(&sample.id).unwrap().len(), 2);
    }

    #[test]
    fn nested_ops_apply_in_one_save() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let sample = plain_sample(&svc);
        let keep = svc
            .create_test(&access(), CreateTestInput {
                test_method_id: method.id.clone(),
                sample_id: sample.id.clone(),
            })
            .unwrap();
        let drop = svc
            .create_test(&access(), CreateTestInput {
                test_method_id: method.id.clone(),
                sample_id: sample.id.clone(),
            })
            .unwrap();

        let after = svc
            .save_sample_tests(&access(), &sample.id, &[
                NestedTest {
                    op: NestedOp::Unchanged,
                    id: Some(keep.id.clone()),
                    test_method_id: None,
                },
                NestedTest {
                    op: NestedOp::Delete,
                    id: Some(drop.id.clone()),
                    test_method_id: None,
                },
                NestedTest {
                    op: NestedOp::Create,
                    id: None,
                    test_method_id: Some(method.id.clone()),
                },
            ])
            .unwrap();

        assert_eq!(after.len(), 2);
        let ids: Vec<&str> = after.iter().map(|t| t.id.as_str()).collect();
        assert!(ids.contains(&keep.id.as_str()));
        assert!(!ids.contains(&drop.id.as_str()));
    }

    #[test]
    fn nested_create_requires_method() {
        let svc = test_service();
        let sample = plain_sample(&svc);

        let err = svc
            .save_sample_tests(&access(), &sample.id, &[NestedTest {
                op: NestedOp::Create,
                id: None,
                test_method_id: None,
            }])
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn nested_op_default_is_unchanged() {
        let row: NestedTest = serde_json::from_str(r#"{"id": "t1"}"#).unwrap();
        assert_eq!(row.op, NestedOp::Unchanged);

        let row: NestedTest =
            serde_json::from_str(r#"{"op": "delete", "id": "t1"}"#).unwrap();
        assert_eq!(row.op, NestedOp::Delete);
    }

    #[test]
    fn delete_sample_removes_its_tests() {
        let svc = test_service();
        let method = svc.create_method(&access(), "ICP-MS").unwrap();
        let sample = plain_sample(&svc);
        let t = svc
            .create_test(&access(), CreateTestInput {
                test_method_id: method.id.clone(),
                sample_id: sample.id.clone(),
            })
            .unwrap();

        svc.delete_sample(&access(), &sample.id).unwrap();
        assert!(svc.get_sample(&sample.id).is_err());
        assert!(svc.get_test(&t.id).is_err());
    }

    #[test]
    fn list_tests_filters() {
        let svc = test_service();
        let icp = svc.create_method(&access(), "ICP-MS").unwrap();
        let gc = svc.create_method(&access(), "GC-FID").unwrap();
        let sample = plain_sample(&svc);
        let batch = svc
            .create_batch(&access(), CreateBatchInput {
                test_method_id: icp.id.clone(),
            })
            .unwrap();

        let t1 = svc
            .create_test(&access(), CreateTestInput {
                test_method_id: icp.id.clone(),
                sample_id: sample.id.clone(),
            })
            .unwrap();
        svc.create_test(&access(), CreateTestInput {
            test_method_id: gc.id.clone(),
            sample_id: sample.id.clone(),
        })
        .unwrap();
        svc.attach_test(&access(), &batch.id, &t1.id).unwrap();

        let by_method = svc
            .list_tests(&ListParams::default(), &TestFilters {
                test_method_id: Some(icp.id.clone()),
                batch_id: None,
            })
            .unwrap();
        assert_eq!(by_method.total, 1);

        let by_batch = svc
            .list_tests(&ListParams::default(), &TestFilters {
                test_method_id: None,
                batch_id: Some(batch.id.clone()),
            })
            .unwrap();
        assert_eq!(by_batch.total, 1);
        assert_eq!(by_batch.items[0].id, t1.id);
    }
}
