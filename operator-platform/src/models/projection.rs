use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use validator::Validate;

use yaraguard_common::Table;

use super::{AlertView, BusView, EventLogView};

/// Decode raw rows, skipping the ones that do not fit `T`.
pub fn project_rows<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(view) => Some(view),
            Err(e) => {
                warn!("Skipping malformed {} row: {}", table, e);
                None
            }
        })
        .collect()
}

pub fn project_fleet(rows: Vec<Value>) -> Vec<BusView> {
    project_rows(Table::Buses, rows)
}

/// Unresolved alerts, newest first, at most `limit` of them.
pub fn project_alerts(rows: Vec<Value>, limit: usize) -> Vec<AlertView> {
    let mut alerts: Vec<AlertView> = project_rows::<AlertView>(Table::Alerts, rows)
        .into_iter()
        .filter(|view| !view.alert.resolved)
        .filter(|view| match &view.detection {
            Some(detection) => match detection.detection.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping alert {} with invalid detection: {}", view.alert.id, e);
                    false
                }
            },
            None => true,
        })
        .collect();

    alerts.sort_by(|a, b| b.alert.created_at.cmp(&a.alert.created_at));
    alerts.truncate(limit);
    alerts
}

/// Event log entries newest first.
pub fn project_event_logs(rows: Vec<Value>) -> Vec<EventLogView> {
    let mut events: Vec<EventLogView> = project_rows::<EventLogView>(Table::EventLogs, rows)
        .into_iter()
        .filter(|view| match view.event.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping event log {}: {}", view.event.id, e);
                false
            }
        })
        .collect();

    events.sort_by(|a, b| b.event.created_at.cmp(&a.event.created_at));
    events
}
