use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use yaraguard_common::{RiskLevel, Table};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::models::{project_alerts, project_fleet, AlertView, BusView, Counters};
use crate::storage::{Direction, Query, RemoteStore, Subscription};
use super::{Mounted, ViewCell};

pub(crate) const FLEET_SELECT: &str = "*, line:bus_lines(*), company:companies(*)";
const ALERT_SELECT: &str = "*, detection:detections(*, suspect:suspects(*), \
     bus:buses(*, line:bus_lines(*), company:companies(*)))";

/// Keeps the fleet list, the unresolved alerts and the headline counters in
/// step with the store.
///
/// A controller is mounted once; unmounting ends its lifetime for good.
pub struct DashboardController {
    store: Arc<dyn RemoteStore>,
    sync: SyncConfig,
    fleet: ViewCell<Vec<BusView>>,
    alerts: ViewCell<Vec<AlertView>>,
    counters: ViewCell<Counters>,
    lifetime: CancellationToken,
}

impl DashboardController {
    pub fn new(store: Arc<dyn RemoteStore>, sync: SyncConfig) -> Self {
        Self {
            store,
            sync,
            fleet: ViewCell::new(Vec::new()),
            alerts: ViewCell::new(Vec::new()),
            counters: ViewCell::new(Counters::default()),
            lifetime: CancellationToken::new(),
        }
    }

    pub fn fleet(&self) -> &ViewCell<Vec<BusView>> {
        &self.fleet
    }

    pub fn alerts(&self) -> &ViewCell<Vec<AlertView>> {
        &self.alerts
    }

    pub fn counters(&self) -> &ViewCell<Counters> {
        &self.counters
    }

    pub fn is_mounted(&self) -> bool {
        !self.lifetime.is_cancelled()
    }

    /// Replaces the fleet list; keeps the previous one if the fetch fails.
    pub async fn load_fleet(&self) {
        let ticket = self.fleet.ticket();
        let query = Query::new(Table::Buses)
            .select(FLEET_SELECT)
            .order_by("status", Direction::Ascending);

        match self.store.select(&query).await {
            Ok(rows) => {
                let fleet = project_fleet(rows);
                let count = fleet.len();
                if self.fleet.commit(ticket, &self.lifetime, fleet) {
                    debug!("Fleet reloaded with {} buses", count);
                }
            }
            Err(e) => warn!("Failed to load fleet, keeping previous list: {}", e),
        }
    }

    /// Replaces the unresolved alert list; keeps the previous one if the fetch fails.
    pub async fn load_alerts(&self) {
        let ticket = self.alerts.ticket();
        let query = Query::new(Table::Alerts)
            .select(ALERT_SELECT)
            .eq("resolved", false)
            .order_by("created_at", Direction::Descending)
            .limit(self.sync.alert_limit);

        match self.store.select(&query).await {
            Ok(rows) => {
                let alerts = project_alerts(rows, self.sync.alert_limit);
                let count = alerts.len();
                if self.alerts.commit(ticket, &self.lifetime, alerts) {
                    debug!("Alerts reloaded with {} entries", count);
                }
            }
            Err(e) => warn!("Failed to load alerts, keeping previous list: {}", e),
        }
    }

    /// Runs the four counts concurrently and publishes them together. A
    /// failed count reads zero without touching its siblings.
    pub async fn load_aggregates(&self) {
        let ticket = self.counters.ticket();

        let buses = Query::new(Table::Buses);
        let active_alerts = Query::new(Table::Alerts).eq("resolved", false);
        let detections = Query::new(Table::Detections);
        let critical = Query::new(Table::Suspects).eq("risk_level", RiskLevel::Critico.as_str());

        let (total_buses, active_alerts, detections, critical_risk) = tokio::join!(
            self.count_or_zero(&buses),
            self.count_or_zero(&active_alerts),
            self.count_or_zero(&detections),
            self.count_or_zero(&critical),
        );

        let counters = Counters {
            total_buses,
            active_alerts,
            detections,
            critical_risk,
        };
        if self.counters.commit(ticket, &self.lifetime, counters) {
            debug!("Counters reloaded: {:?}", counters);
        }
    }

    async fn count_or_zero(&self, query: &Query) -> u64 {
        match self.store.count(query).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Count on {} failed, reporting 0: {}", query.table, e);
                0
            }
        }
    }

    pub async fn load_all(&self) {
        tokio::join!(self.load_fleet(), self.load_alerts(), self.load_aggregates());
    }

    /// Subscribes to buses and alerts, loads every view and starts one
    /// watcher per subscription. A subscription that cannot be opened is
    /// logged and the view still loads.
    pub async fn mount(self: Arc<Self>) -> Result<Mounted<Self>> {
        let mounted = Mounted::new(self.clone(), &self.lifetime);

        for table in [Table::Buses, Table::Alerts] {
            match self.store.subscribe(table, &self.lifetime).await {
                Ok(subscription) => {
                    tokio::spawn(self.clone().watch(subscription));
                }
                Err(e) => warn!("Live updates for {} unavailable: {}", table, e),
            }
        }

        self.load_all().await;
        info!("Dashboard mounted");
        Ok(mounted)
    }

    async fn watch(self: Arc<Self>, mut subscription: Subscription) {
        let table = subscription.table();
        while let Some(event) = subscription.recv().await {
            debug!("{:?} on {}, reloading", event.kind, table);
            let controller = self.clone();
            tokio::spawn(async move {
                match table {
                    Table::Buses => {
                        tokio::join!(controller.load_fleet(), controller.load_aggregates());
                    }
                    Table::Alerts => {
                        tokio::join!(controller.load_alerts(), controller.load_aggregates());
                    }
                    _ => {}
                }
            });
        }
        debug!("Stopped watching {}", table);
    }

    /// First unresolved alert raised on `bus_id`.
    pub fn alert_for_bus(&self, bus_id: Uuid) -> Option<AlertView> {
        self.alerts
            .snapshot()
            .into_iter()
            .find(|alert| alert.bus_id() == Some(bus_id))
    }
}
