mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use yaraguard_common::{RiskLevel, Table};
use yaraguard_operator::services::{CameraMonitor, Mounted};
use yaraguard_operator::storage::{MemoryStore, RemoteStore};
use yaraguard_simulator::{AiSimulator, RecognitionPipeline, SimulatorConfig};

use common::*;

fn seed(store: &MemoryStore, a: Uuid, b: Uuid) {
    store.replace(
        Table::Buses,
        vec![bus_row(b, "1002", "normal"), bus_row(a, "1001", "alerta")],
    );

    let mut identified = event_row(
        id(12),
        a,
        "person_identified",
        "Suspeito identificado: João Silva",
        "2025-03-01T10:02:00Z",
    );
    identified["confidence_level"] = json!(92.5);
    identified["metadata"] = json!({ "risk_level": "alto" });

    store.replace(
        Table::EventLogs,
        vec![
            event_row(id(10), a, "camera_online", "Câmera conectada", "2025-03-01T10:00:00Z"),
            event_row(id(11), a, "detection_attempt", "Analisando rosto", "2025-03-01T10:01:00Z"),
            identified,
            event_row(id(20), b, "camera_online", "Câmera conectada", "2025-03-01T09:00:00Z"),
            event_row(id(21), b, "camera_offline", "Câmera desconectada", "2025-03-01T09:30:00Z"),
        ],
    );
}

async fn start(store: &Arc<MemoryStore>, sample_probability: f64, preferred: Option<Uuid>) -> Mounted<CameraMonitor> {
    let remote: Arc<dyn RemoteStore> = store.clone();
    let pipeline: Arc<dyn RecognitionPipeline> = Arc::new(AiSimulator::new(&SimulatorConfig {
        processing_delay_ms: 1500,
        sample_probability,
    }));
    Arc::new(CameraMonitor::new(remote, pipeline, sync()))
        .start(preferred)
        .await
        .unwrap()
}

fn event_queries_for(store: &MemoryStore, bus_id: Uuid) -> usize {
    store
        .queries()
        .iter()
        .filter(|q| q.table == Table::EventLogs && q.filters_on("bus_id", &json!(bus_id.to_string())))
        .count()
}

#[tokio::test(start_paused = true)]
async fn starts_on_first_bus_and_derives_last_detection() {
    let store = store();
    let (a, b) = (id(1), id(2));
    seed(&store, a, b);

    let monitor = start(&store, 0.0, None).await;
    assert_eq!(monitor.selected(), Some(a));
    assert_eq!(monitor.buses().snapshot().len(), 2);

    tokio::time::sleep(Duration::from_millis(10)).await;
    let events = monitor.events().snapshot();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.event.bus_id == a));
    assert!(monitor.camera_online());

    let detection = monitor.last_detection().snapshot().unwrap();
    assert_eq!(detection.person_name, "João Silva");
    assert_eq!(detection.confidence, 92.5);
    assert_eq!(detection.risk_level, Some(RiskLevel::Alto));
    assert!(!detection.is_alert);
}

#[tokio::test(start_paused = true)]
async fn opens_on_first_bus_in_status_order() {
    let store = store();
    let (a, b) = (id(1), id(2));
    store.replace(
        Table::Buses,
        vec![bus_row(a, "1001", "normal"), bus_row(b, "1002", "alerta")],
    );

    let monitor = start(&store, 0.0, None).await;
    assert_eq!(monitor.selected(), Some(b));

    let bus_query = store
        .queries()
        .into_iter()
        .find(|q| q.table == Table::Buses)
        .unwrap();
    assert_eq!(bus_query.order.unwrap().column, "status");
}

#[tokio::test(start_paused = true)]
async fn processing_starts_while_events_load() {
    let store = store();
    seed(&store, id(1), id(2));
    store.set_latency(Table::EventLogs, Duration::from_secs(3));

    let monitor = start(&store, 0.0, None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(monitor.is_processing());
    assert!(monitor.events().snapshot().is_empty());

    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert!(!monitor.is_processing());
    assert_eq!(monitor.events().snapshot().len(), 3);
    assert_eq!(monitor.last_detection().snapshot().unwrap().person_name, "João Silva");
}

#[tokio::test(start_paused = true)]
async fn selection_runs_recognition_immediately() {
    let store = store();
    seed(&store, id(1), id(2));

    let monitor = start(&store, 0.0, None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(monitor.is_processing());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!monitor.is_processing());
}

#[tokio::test(start_paused = true)]
async fn preferred_bus_is_selected_when_known() {
    let store = store();
    let (a, b) = (id(1), id(2));
    seed(&store, a, b);

    let monitor = start(&store, 0.0, Some(b)).await;
    assert_eq!(monitor.selected(), Some(b));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!monitor.camera_online());
    // The newest row is not a recognition outcome.
    assert!(monitor.last_detection().snapshot().is_none());

    let fallback = start(&store, 0.0, Some(id(99))).await;
    assert_eq!(fallback.selected(), Some(a));
}

#[tokio::test(start_paused = true)]
async fn polls_on_the_configured_interval() {
    let store = store();
    let a = id(1);
    seed(&store, a, id(2));

    let _monitor = start(&store, 0.0, None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(event_queries_for(&store, a), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(event_queries_for(&store, a), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(event_queries_for(&store, a), 4);
}

#[tokio::test(start_paused = true)]
async fn switching_bus_stops_polling_the_previous_one() {
    let store = store();
    let (a, b) = (id(1), id(2));
    seed(&store, a, b);

    let monitor = start(&store, 1.0, None).await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(event_queries_for(&store, a) >= 2);

    monitor.view().select_bus(b);
    store.clear_queries();
    tokio::time::sleep(Duration::from_secs(21)).await;

    assert_eq!(event_queries_for(&store, a), 0);
    assert!(event_queries_for(&store, b) >= 4);
    assert_eq!(monitor.selected(), Some(b));
    assert!(monitor.events().snapshot().iter().all(|e| e.event.bus_id == b));
}

#[tokio::test(start_paused = true)]
async fn late_response_for_previous_bus_is_dropped() {
    let store = store();
    let (a, b) = (id(1), id(2));
    seed(&store, a, b);
    store.set_latency(Table::EventLogs, Duration::from_secs(3));

    let monitor = start(&store, 0.0, None).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    monitor.view().select_bus(b);

    tokio::time::sleep(Duration::from_secs(4)).await;
    let events = monitor.events().snapshot();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event.bus_id == b));
}

#[tokio::test(start_paused = true)]
async fn failed_reload_keeps_previous_event_log() {
    let store = store();
    seed(&store, id(1), id(2));

    let monitor = start(&store, 0.0, None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(monitor.events().snapshot().len(), 3);

    store.set_failing(Table::EventLogs, true);
    tokio::time::sleep(Duration::from_secs(5)).await;
    monitor.refresh_events().await;

    assert_eq!(monitor.events().snapshot().len(), 3);
    assert!(monitor.last_detection().snapshot().is_some());
}

#[tokio::test(start_paused = true)]
async fn unmount_stops_polling() {
    let store = store();
    seed(&store, id(1), id(2));

    let monitor = start(&store, 1.0, None).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    monitor.unmount();
    store.clear_queries();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(store.queries().is_empty());
}
