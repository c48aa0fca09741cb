use serde::{Deserialize, Serialize};

/// Batch — a group of tests processed together under one test method.
///
/// Attached tests hang off `tests.batch_id`; pipets are shared through the
/// `batch_pipets` join. Every attached test must share the batch's method.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    /// Test method this batch is constrained to.
    pub test_method_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
