use serde::{Deserialize, Serialize};

use yaraguard_common::{EventLog, EventType, Suspect};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogView {
    #[serde(flatten)]
    pub event: EventLog,
    #[serde(default)]
    pub suspect: Option<Suspect>,
}

/// Camera state implied by a newest-first event log: the latest
/// `camera_online`/`camera_offline` entry wins, online when there is none.
pub fn camera_online(events: &[EventLogView]) -> bool {
    events
        .iter()
        .find_map(|view| match view.event.event_type {
            EventType::CameraOnline => Some(true),
            EventType::CameraOffline => Some(false),
            _ => None,
        })
        .unwrap_or(true)
}
