pub mod alert;
pub mod event_log;
pub mod fleet;
pub mod projection;

pub use alert::{AlertView, Counters, DetectionView};
pub use event_log::{camera_online, EventLogView};
pub use fleet::{BusView, MapPosition, VisualState};
pub use projection::{project_alerts, project_event_logs, project_fleet, project_rows};
