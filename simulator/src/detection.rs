use yaraguard_common::{EventLog, EventType, LastDetection};

pub const UNKNOWN_PERSON: &str = "Desconhecido";
pub const IDENTIFIED_FALLBACK: &str = "Detectado";
pub const PLACEHOLDER_PHOTO_URL: &str =
    "https://images.pexels.com/photos/220453/pexels-photo-220453.jpeg?auto=compress&cs=tinysrgb&w=400";

/// Builds the camera-panel summary from one event-log row.
///
/// Only recognition outcomes (`person_identified`, `no_match`,
/// `alert_triggered`) produce a summary. Nothing beyond the row is consulted.
pub fn derive_last_detection(event: &EventLog) -> Option<LastDetection> {
    if !event.event_type.is_recognition_outcome() {
        return None;
    }

    let person_name = match event.event_type {
        EventType::PersonIdentified => identified_name(&event.message)
            .unwrap_or(IDENTIFIED_FALLBACK)
            .to_string(),
        _ => UNKNOWN_PERSON.to_string(),
    };

    Some(LastDetection {
        person_name,
        confidence: event.confidence_level.unwrap_or(0.0),
        photo_url: event
            .camera_frame_url
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_PHOTO_URL.to_string()),
        risk_level: event.risk_level(),
        is_alert: event.event_type == EventType::AlertTriggered,
    })
}

// Messages look like "Pessoa identificada: <name>".
fn identified_name(message: &str) -> Option<&str> {
    message.split(": ").nth(1).filter(|name| !name.is_empty())
}
