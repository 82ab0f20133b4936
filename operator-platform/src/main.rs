use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use yaraguard_operator::config::OperatorConfig;
use yaraguard_operator::services::{CameraMonitor, DashboardController, Versioned};
use yaraguard_operator::storage::{PgChangeFeed, RemoteStore, RestStore};
use yaraguard_simulator::{AiSimulator, RecognitionPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/operator.toml")]
    config: String,

    /// Log level, overrides `logging.level`
    #[arg(short, long)]
    log_level: Option<String>,

    /// View to mount
    #[arg(long, value_enum, default_value_t = View::Dashboard)]
    view: View,

    /// Bus to open the camera view on
    #[arg(long)]
    bus: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Dashboard,
    Camera,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Missing store parameters end the process here.
    let config = OperatorConfig::load(Some(args.config.as_str()))?;

    let level = args.log_level.as_deref().unwrap_or(config.logging.level.as_str());
    init_logging(level)?;

    info!("Starting YaraGuard operator ({:?} view)", args.view);

    let feed = PgChangeFeed::from_config(&config.realtime);
    if let Some(feed) = &feed {
        if config.realtime.install_triggers {
            feed.install_triggers().await?;
        }
    } else {
        warn!("realtime.database_url not set, live updates disabled");
    }

    let store: Arc<dyn RemoteStore> = Arc::new(RestStore::new(&config.store, feed)?);

    match args.view {
        View::Dashboard => {
            let dashboard = Arc::new(DashboardController::new(store, config.sync.clone()));
            let mounted = dashboard.mount().await?;

            let map = config.map.clone();
            tokio::spawn(render(mounted.fleet().watch(), move |fleet| {
                for bus in fleet {
                    let position = bus.map_position(&map);
                    info!(
                        "{} [{:?}] at ({:.1}%, {:.1}%)",
                        bus.selector_label(),
                        bus.visual_state(),
                        position.x,
                        position.y
                    );
                }
            }));
            tokio::spawn(render(mounted.alerts().watch(), |alerts| {
                let now = Utc::now();
                for alert in alerts {
                    info!(
                        "Alert {:?} {}: {} ({})",
                        alert.alert.severity,
                        alert.suspect().map(|s| s.name.as_str()).unwrap_or("—"),
                        alert.alert.message,
                        alert.age_label(now)
                    );
                }
            }));
            tokio::spawn(render(mounted.counters().watch(), |counters| {
                info!(
                    "Buses: {} | Active alerts: {} | Detections: {} | Critical risk: {}",
                    counters.total_buses,
                    counters.active_alerts,
                    counters.detections,
                    counters.critical_risk
                );
            }));

            wait_for_shutdown().await;
            mounted.unmount();
        }
        View::Camera => {
            let pipeline: Arc<dyn RecognitionPipeline> = Arc::new(AiSimulator::new(&config.simulator));
            let monitor = Arc::new(CameraMonitor::new(store, pipeline, config.sync.clone()));
            let mounted = monitor.start(args.bus).await?;

            let camera = mounted.view().clone();
            tokio::spawn(render(mounted.events().watch(), move |events| {
                let status = if camera.camera_online() { "online" } else { "offline" };
                info!("Camera {} with {} events", status, events.len());
                for entry in events.iter().take(5) {
                    info!("  {:?}: {}", entry.event.event_type, entry.event.message);
                }
            }));
            tokio::spawn(render(mounted.last_detection().watch(), |detection| {
                if let Some(detection) = detection {
                    info!(
                        "Last detection: {} ({:.1}%){}",
                        detection.person_name,
                        detection.confidence,
                        if detection.is_alert { " ALERT" } else { "" }
                    );
                }
            }));

            let mut processing = mounted.processing();
            tokio::spawn(async move {
                while processing.changed().await.is_ok() {
                    let busy = processing.borrow().is_processing();
                    info!("AI processing: {}", busy);
                }
            });

            wait_for_shutdown().await;
            mounted.unmount();
        }
    }

    info!("Shutting down YaraGuard operator");
    Ok(())
}

/// Logs every published value of a view until it is dropped.
async fn render<T, F>(mut rx: watch::Receiver<Versioned<T>>, show: F)
where
    F: Fn(&T),
{
    while rx.changed().await.is_ok() {
        let current = rx.borrow_and_update();
        show(&current.value);
    }
}

fn init_logging(level: &str) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Unknown names fall back to `info`.
fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_levels() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level(" trace "), Level::TRACE);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn view_flags() {
        let args = Args::try_parse_from(["yaraguard-operator", "--view", "camera", "--log-level", "debug"]).unwrap();
        assert_eq!(args.view, View::Camera);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.bus.is_none());

        let args = Args::try_parse_from(["yaraguard-operator"]).unwrap();
        assert_eq!(args.view, View::Dashboard);
        assert_eq!(args.config, "config/operator.toml");
    }
}
