use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use yaraguard_common::{LastDetection, Table};
use yaraguard_simulator::{derive_last_detection, ProcessingState, RecognitionPipeline};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::models::{camera_online, project_event_logs, project_fleet, BusView, EventLogView};
use crate::storage::{Direction, Query, RemoteStore};
use super::dashboard::FLEET_SELECT;
use super::{Mounted, ViewCell};

const EVENT_SELECT: &str = "*, suspect:suspects(*)";

/// Camera view of one selected bus: its recent event log, the last
/// recognition outcome and the pipeline's processing flag.
///
/// The event log of the selected bus is polled on a fixed interval. Each
/// selection owns a poll scope; selecting another bus cancels it before the
/// next one starts, so at most one poll loop is ever active.
pub struct CameraMonitor {
    store: Arc<dyn RemoteStore>,
    pipeline: Arc<dyn RecognitionPipeline>,
    sync: SyncConfig,
    buses: ViewCell<Vec<BusView>>,
    events: ViewCell<Vec<EventLogView>>,
    last_detection: ViewCell<Option<LastDetection>>,
    selected: watch::Sender<Option<Uuid>>,
    poll_scope: Mutex<Option<CancellationToken>>,
    lifetime: CancellationToken,
}

impl CameraMonitor {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        pipeline: Arc<dyn RecognitionPipeline>,
        sync: SyncConfig,
    ) -> Self {
        let (selected, _) = watch::channel(None);
        Self {
            store,
            pipeline,
            sync,
            buses: ViewCell::new(Vec::new()),
            events: ViewCell::new(Vec::new()),
            last_detection: ViewCell::new(None),
            selected,
            poll_scope: Mutex::new(None),
            lifetime: CancellationToken::new(),
        }
    }

    pub fn buses(&self) -> &ViewCell<Vec<BusView>> {
        &self.buses
    }

    pub fn events(&self) -> &ViewCell<Vec<EventLogView>> {
        &self.events
    }

    pub fn last_detection(&self) -> &ViewCell<Option<LastDetection>> {
        &self.last_detection
    }

    pub fn selected(&self) -> Option<Uuid> {
        *self.selected.borrow()
    }

    pub fn watch_selected(&self) -> watch::Receiver<Option<Uuid>> {
        self.selected.subscribe()
    }

    pub fn processing(&self) -> watch::Receiver<ProcessingState> {
        self.pipeline.processing()
    }

    pub fn is_processing(&self) -> bool {
        self.pipeline.processing().borrow().is_processing()
    }

    pub fn camera_online(&self) -> bool {
        camera_online(&self.events.snapshot())
    }

    /// Loads the bus list ordered by status and selects `preferred` when it
    /// is known, otherwise the first bus.
    pub async fn start(self: Arc<Self>, preferred: Option<Uuid>) -> Result<Mounted<Self>> {
        let mounted = Mounted::new(self.clone(), &self.lifetime);
        self.load_buses().await;

        let buses = self.buses.snapshot();
        let known = |id: &Uuid| buses.iter().any(|bus| bus.id() == *id);
        let target = match preferred {
            Some(id) if known(&id) => Some(id),
            Some(id) => {
                warn!("Bus {} not found, falling back to the first bus", id);
                buses.first().map(BusView::id)
            }
            None => buses.first().map(BusView::id),
        };

        match target {
            Some(bus_id) => self.select_bus(bus_id),
            None => warn!("No buses available to monitor"),
        }

        info!("Camera monitor started with {} buses", buses.len());
        Ok(mounted)
    }

    pub async fn load_buses(&self) {
        let ticket = self.buses.ticket();
        let query = Query::new(Table::Buses)
            .select(FLEET_SELECT)
            .order_by("status", Direction::Ascending);

        match self.store.select(&query).await {
            Ok(rows) => {
                self.buses.commit(ticket, &self.lifetime, project_fleet(rows));
            }
            Err(e) => warn!("Failed to load buses, keeping previous list: {}", e),
        }
    }

    /// Switches the camera to `bus_id`: stops the previous poll loop, clears
    /// the per-bus views and starts a fresh load and recognition cycle.
    pub fn select_bus(self: &Arc<Self>, bus_id: Uuid) {
        let scope = self.lifetime.child_token();
        {
            let mut current = self.poll_scope.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(previous) = current.replace(scope.clone()) {
                previous.cancel();
            }
        }

        let events = self.events.ticket();
        self.events.commit(events, &scope, Vec::new());
        let detection = self.last_detection.ticket();
        self.last_detection.commit(detection, &scope, None);
        self.selected.send_replace(Some(bus_id));

        info!("Monitoring bus {}", bus_id);
        tokio::spawn(self.clone().poll(bus_id, scope));
    }

    // Recognition runs alongside the reload; the reload derives the last
    // detection from the rows it brings back.
    async fn poll(self: Arc<Self>, bus_id: Uuid, scope: CancellationToken) {
        self.spawn_recognition(bus_id, &scope);
        tokio::select! {
            biased;
            _ = scope.cancelled() => return,
            _ = self.reload_events(bus_id, &scope) => {}
        }

        let period = self.sync.poll_interval();
        let mut ticker = time::interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.pipeline.should_sample() {
                self.spawn_recognition(bus_id, &scope);
            }
            tokio::select! {
                biased;
                _ = scope.cancelled() => break,
                _ = self.reload_events(bus_id, &scope) => {}
            }
        }
        debug!("Stopped polling bus {}", bus_id);
    }

    fn spawn_recognition(self: &Arc<Self>, bus_id: Uuid, scope: &CancellationToken) {
        let monitor = self.clone();
        let scope = scope.clone();
        let ticket = self.last_detection.ticket();
        let latest = self.events.snapshot().into_iter().next().map(|view| view.event);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = scope.cancelled() => {}
                detection = monitor.pipeline.recognize(bus_id, latest.as_ref()) => {
                    if let Some(detection) = detection {
                        monitor.last_detection.commit(ticket, &scope, Some(detection));
                    }
                }
            }
        });
    }

    /// Reloads the event log of the selected bus, if any.
    pub async fn refresh_events(&self) {
        let scope = self
            .poll_scope
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let (Some(bus_id), Some(scope)) = (self.selected(), scope) {
            self.reload_events(bus_id, &scope).await;
        }
    }

    async fn reload_events(&self, bus_id: Uuid, scope: &CancellationToken) {
        let events_ticket = self.events.ticket();
        let detection_ticket = self.last_detection.ticket();
        let query = Query::new(Table::EventLogs)
            .select(EVENT_SELECT)
            .eq("bus_id", bus_id.to_string())
            .order_by("created_at", Direction::Descending)
            .limit(self.sync.event_log_limit);

        let rows = match self.store.select(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to load events for bus {}, keeping previous log: {}", bus_id, e);
                return;
            }
        };

        let events = project_event_logs(rows);
        let latest = events
            .first()
            .filter(|view| view.event.event_type.is_recognition_outcome())
            .and_then(|view| derive_last_detection(&view.event));

        let count = events.len();
        if self.events.commit(events_ticket, scope, events) {
            debug!("Loaded {} events for bus {}", count, bus_id);
        }
        if let Some(detection) = latest {
            self.last_detection.commit(detection_ticket, scope, Some(detection));
        }
    }
}
