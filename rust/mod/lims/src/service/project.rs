use serde::Deserialize;

use labtrack_core::{ListParams, ListResult, ServiceError, WriteAccess, new_id, now_rfc3339};
use labtrack_sql::Value;

use super::LimsService;
use crate::model::Project;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectInput {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sample_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lot: String,
}

#[derive(Debug, Default)]
pub struct ProjectFilters {
    pub user_id: Option<String>,
    pub received: Option<bool>,
    pub completed: Option<bool>,
    pub reported: Option<bool>,
    pub invoiced: Option<bool>,
    pub paid: Option<bool>,
}

fn flag(v: bool) -> Value {
    Value::Integer(v as i64)
}

impl LimsService {
    pub fn create_project(
        &self,
        _access: &WriteAccess,
        input: CreateProjectInput,
    ) -> Result<Project, ServiceError> {
        let id = new_id();
        let now = now_rfc3339();
        let record = Project {
            id: id.clone(),
            received: false,
            completed: false,
            reported: false,
            invoiced: false,
            paid: false,
            user_id: input.user_id.clone(),
            sample_id: input.sample_id,
            description: input.description,
            lot: input.lot,
            create_at: Some(now.clone()),
            update_at: Some(now.clone()),
        };

        self.insert_record("projects", &id, &record, &[
            ("user_id", match input.user_id {
                Some(u) => Value::Text(u),
                None => Value::Null,
            }),
            ("received", flag(false)),
            ("completed", flag(false)),
            ("reported", flag(false)),
            ("invoiced", flag(false)),
            ("paid", flag(false)),
            ("create_at", Value::Text(now.clone())),
            ("update_at", Value::Text(now)),
        ])?;

        Ok(record)
    }

    pub fn get_project(&self, id: &str) -> Result<Project, ServiceError> {
        self.get_record("projects", id)
    }

    pub fn list_projects(
        &self,
        params: &ListParams,
        filters: &ProjectFilters,
    ) -> Result<ListResult<Project>, ServiceError> {
        let limit = params.limit.min(500);
        let mut f: Vec<(&str, Value)> = Vec::new();
        if let Some(ref u) = filters.user_id {
            f.push(("user_id", Value::Text(u.clone())));
        }
        for (col, val) in [
            ("received", filters.received),
            ("completed", filters.completed),
            ("reported", filters.reported),
            ("invoiced", filters.invoiced),
            ("paid", filters.paid),
        ] {
            if let Some(v) = val {
                f.push((col, flag(v)));
            }
        }
        self.list_records("projects", &f, limit, params.offset)
    }

    pub fn update_project(
        &self,
        _access: &WriteAccess,
        id: &str,
        patch: serde_json::Value,
    ) -> Result<Project, ServiceError> {
        let current: Project = self.get_record("projects", id)?;
        let updated: Project = Self::apply_patch(&current, patch)?;

        self.update_record("projects", id, &updated, &[
            ("user_id", match updated.user_id.clone() {
                Some(u) => Value::Text(u),
                None => Value::Null,
            }),
            ("received", flag(updated.received)),
            ("completed", flag(updated.completed)),
            ("reported", flag(updated.reported)),
            ("invoiced", flag(updated.invoiced)),
            ("paid", flag(updated.paid)),
            ("update_at", Value::Text(updated.update_at.clone().unwrap_or_default())),
        ])?;

        Ok(updated)
    }

    pub fn delete_project(&self, _access: &WriteAccess, id: &str) -> Result<(), ServiceError> {
        self.delete_record("projects", id)
    }
}

#[cfg(test)]
mod tests {
    use labtrack_core::{Role, require_write};
    use labtrack_sql::SqliteStore;

    use super::*;

    fn test_service() -> LimsService {
        let sql = Box::new(SqliteStore::open_in_memory().unwrap());
        LimsService::new(sql).unwrap()
    }

    fn access() -> WriteAccess {
        require_write(Role::Admin).unwrap()
    }

    #[test]
    fn project_crud() {
        let svc = test_service();

        let project = svc
            .create_project(&access(), CreateProjectInput {
                user_id: Some("u1".into()),
                sample_id: None,
                description: "stability study".into(),
                lot: "L-42".into(),
            })
            .unwrap();
        assert!(!project.received);
        assert!(!project.paid);

        let updated = svc
            .update_project(&access(), &project.id, serde_json::json!({"received": true}))
            .unwrap();
        assert!(updated.received);
        assert!(!updated.completed);

        svc.delete_project(&access(), &project.id).unwrap();
        assert!(svc.get_project(&project.id).is_err());
    }

    #[test]
    fn list_filters_by_flag_and_owner() {
        let svc = test_service();
        let p1 = svc
            .create_project(&access(), CreateProjectInput {
                user_id: Some("u1".into()),
                ..Default::default()
            })
            .unwrap();
        svc.create_project(&access(), CreateProjectInput {
            user_id: Some("u2".into()),
            ..Default::default()
        })
        .unwrap();
        svc.update_project(&access(), &p1.id, serde_json::json!({"received": true}))
            .unwrap();

        let received = svc
            .list_projects(&ListParams::default(), &ProjectFilters {
                received: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(received.total, 1);
        assert_eq!(received.items[0].id, p1.id);

        let pending = svc
            .list_projects(&ListParams::default(), &ProjectFilters {
                received: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(pending.total, 1);

        let by_user = svc
            .list_projects(&ListParams::default(), &ProjectFilters {
                user_id: Some("u1".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_user.total, 1);
    }
}
