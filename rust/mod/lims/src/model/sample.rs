use serde::{Deserialize, Serialize};

/// Sample — the physical material tests are run against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    pub name: String,

    /// Manufacturer lot number.
    #[serde(default)]
    pub lot: String,

    /// Owning project, if any.
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
