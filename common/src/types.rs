use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BusLine {
    pub id: Uuid,
    pub line_number: String,
    pub name: String,
    pub company_id: Uuid,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bus {
    pub id: Uuid,
    pub bus_number: String,
    pub plate: String,
    #[serde(default)]
    pub line_id: Option<Uuid>,
    pub company_id: Uuid,
    pub status: BusStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// Variants are declared least to most severe; the derived ordering relies on it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Normal,
    Alerta,
    Emergencia,
}

impl BusStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusStatus::Normal => "normal",
            BusStatus::Alerta => "alerta",
            BusStatus::Emergencia => "emergencia",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CriminalRecord {
    pub crime: String,
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "local")]
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Suspect {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub criminal_record: Vec<CriminalRecord>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Baixo,
    Medio,
    Alto,
    Critico,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Baixo => "baixo",
            RiskLevel::Medio => "medio",
            RiskLevel::Alto => "alto",
            RiskLevel::Critico => "critico",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct Detection {
    pub id: Uuid,
    pub suspect_id: Uuid,
    pub bus_id: Uuid,
    #[serde(default)]
    pub detected_at: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub confidence_level: f64,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub status: DetectionStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Pendente,
    EmAtendimento,
    Resolvido,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub detection_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub resolved: bool,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ReconhecimentoFacial,
    ComportamentoSuspeito,
    ArmaDetectada,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Baixa,
    Media,
    Alta,
    Critica,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct EventLog {
    pub id: Uuid,
    pub bus_id: Uuid,
    pub event_type: EventType,
    pub message: String,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 100.0))]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub suspect_id: Option<Uuid>,
    #[serde(default)]
    pub camera_frame_url: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl EventLog {
    /// Risk level carried in `metadata.risk_level`, if present and recognised.
    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.metadata
            .get("risk_level")
            .and_then(|value| RiskLevel::deserialize(value).ok())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CameraOnline,
    CameraOffline,
    DetectionAttempt,
    PersonIdentified,
    NoMatch,
    AlertTriggered,
}

impl EventType {
    /// Events that close a recognition attempt and can feed the camera panel.
    pub fn is_recognition_outcome(&self) -> bool {
        matches!(
            self,
            EventType::PersonIdentified | EventType::NoMatch | EventType::AlertTriggered
        )
    }
}

/// Summary shown by the camera panel for the most recent recognition outcome.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LastDetection {
    pub person_name: String,
    pub confidence: f64,
    pub photo_url: String,
    pub risk_level: Option<RiskLevel>,
    pub is_alert: bool,
}

// Change notifications
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Companies,
    BusLines,
    Buses,
    Suspects,
    Detections,
    Alerts,
    EventLogs,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Companies => "companies",
            Table::BusLines => "bus_lines",
            Table::Buses => "buses",
            Table::Suspects => "suspects",
            Table::Detections => "detections",
            Table::Alerts => "alerts",
            Table::EventLogs => "event_logs",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row in `table` changed. Carries no row content.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}
