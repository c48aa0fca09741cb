use serde::{Deserialize, Serialize};

/// Pipet — a calibrated instrument, shared across batches through the
/// `batch_pipets` join. Attaching a pipet to a batch implies no ownership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pipet {
    /// UUID primary key.
    #[serde(default)]
    pub id: String,

    /// Date of the last calibration (RFC 3339 date).
    pub calibration_date: String,

    /// Date the next calibration is due.
    pub calibration_due: String,

    /// Largest dispensable volume, microliters.
    pub max_volume: u32,

    /// Smallest dispensable volume, microliters.
    pub min_volume: u32,

    /// Whether the volume setting is adjustable.
    pub adjustable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_at: Option<String>,
}
