use serde::{Deserialize, Serialize};

/// Project — a client engagement with boolean milestone flags.
///
/// Flags move forward as external workflow steps complete (received →
/// completed → reported → invoiced → paid); the tracker records them,
/// it does not sequence them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub received: bool,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub reported: bool,

    #[serde(default)]
    pub invoiced: bool,

    #[serde(default)]
    pub paid: bool,

    /// Owning user.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Primary sample for this engagement.
    #[serde(default)]
    pub sample_id: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub lot: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
