use serde::{Deserialize, Serialize};

/// TestMethod — the measurement protocol a test and batch are constrained to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestMethod {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    /// Method name (e.g. "ICP-MS trace metals"). Unique.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
