use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use yaraguard_common::utils::relative_time;
use yaraguard_common::{Alert, Detection, Suspect};

use super::BusView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionView {
    #[serde(flatten)]
    pub detection: Detection,
    #[serde(default)]
    pub suspect: Option<Suspect>,
    #[serde(default)]
    pub bus: Option<BusView>,
}

/// An alert with its detection, suspect and bus resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    #[serde(default)]
    pub detection: Option<DetectionView>,
}

impl AlertView {
    pub fn id(&self) -> Uuid {
        self.alert.id
    }

    /// Bus the underlying detection happened on.
    pub fn bus_id(&self) -> Option<Uuid> {
        self.detection.as_ref().map(|d| d.detection.bus_id)
    }

    pub fn suspect(&self) -> Option<&Suspect> {
        self.detection.as_ref().and_then(|d| d.suspect.as_ref())
    }

    pub fn age_label(&self, now: DateTime<Utc>) -> String {
        relative_time(self.alert.created_at, now)
    }
}

/// Headline numbers of the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub total_buses: u64,
    pub active_alerts: u64,
    pub detections: u64,
    pub critical_risk: u64,
}
