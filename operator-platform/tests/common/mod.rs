#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use yaraguard_common::Table;
use yaraguard_operator::config::SyncConfig;
use yaraguard_operator::storage::MemoryStore;

pub const COMPANY: &str = "0b6e4a4c-1b6d-4f1e-9a53-0c5d2f6e7a88";
pub const LINE: &str = "5d3e2f10-9a8b-4c7d-8e6f-5a4b3c2d1e0f";
pub const SUSPECT: &str = "22222222-3333-4444-8555-666666666666";

pub fn id(n: u32) -> Uuid {
    Uuid::parse_str(&format!("00000000-0000-4000-8000-{:012}", n)).unwrap()
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn sync() -> SyncConfig {
    SyncConfig::default()
}

pub fn bus_row(bus_id: Uuid, number: &str, status: &str) -> Value {
    json!({
        "id": bus_id.to_string(),
        "bus_number": number,
        "plate": format!("PHX-{}", number),
        "line_id": LINE,
        "company_id": COMPANY,
        "status": status,
        "latitude": -3.1190,
        "longitude": -60.0210,
        "line": {
            "id": LINE,
            "line_number": "640",
            "name": "Centro - Cidade Nova",
            "company_id": COMPANY
        },
        "company": { "id": COMPANY, "name": "Viação Rio Negro" }
    })
}

pub fn suspect_row(risk_level: &str) -> Value {
    json!({
        "id": SUSPECT,
        "name": "João Silva",
        "risk_level": risk_level,
        "criminal_record": [
            { "crime": "Roubo", "data": "2023-05-10", "local": "Centro" }
        ]
    })
}

pub fn detection_row(detection_id: Uuid, bus_id: Uuid) -> Value {
    json!({
        "id": detection_id.to_string(),
        "suspect_id": SUSPECT,
        "bus_id": bus_id.to_string(),
        "confidence_level": 94.2,
        "status": "pendente",
        "detected_at": "2025-03-01T10:00:00Z"
    })
}

/// Alert row with its detection, suspect and bus joined in.
pub fn alert_row(alert_id: Uuid, bus: &Value, severity: &str, resolved: bool, created_at: &str) -> Value {
    let detection_id = Uuid::new_v4();
    let bus_id = Uuid::parse_str(bus["id"].as_str().unwrap()).unwrap();
    let mut detection = detection_row(detection_id, bus_id);
    detection["suspect"] = suspect_row("critico");
    detection["bus"] = bus.clone();

    json!({
        "id": alert_id.to_string(),
        "detection_id": detection_id.to_string(),
        "alert_type": "reconhecimento_facial",
        "severity": severity,
        "message": "Suspeito de alta periculosidade identificado",
        "resolved": resolved,
        "created_at": created_at,
        "detection": detection
    })
}

pub fn event_row(event_id: Uuid, bus_id: Uuid, event_type: &str, message: &str, created_at: &str) -> Value {
    json!({
        "id": event_id.to_string(),
        "bus_id": bus_id.to_string(),
        "event_type": event_type,
        "message": message,
        "created_at": created_at,
        "suspect": null
    })
}

/// One emergency bus, one critical unresolved alert on it, its detection
/// and a critical-risk suspect.
pub fn seed_emergency(store: &MemoryStore, bus_id: Uuid) {
    let bus = bus_row(bus_id, "1042", "emergencia");
    store.replace(Table::Buses, vec![bus.clone()]);
    store.replace(
        Table::Alerts,
        vec![alert_row(id(500), &bus, "critica", false, "2025-03-01T10:00:00Z")],
    );
    store.replace(Table::Detections, vec![detection_row(id(600), bus_id)]);
    store.replace(Table::Suspects, vec![suspect_row("critico")]);
}
