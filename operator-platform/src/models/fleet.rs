use serde::{Deserialize, Serialize};

use yaraguard_common::{Bus, BusLine, BusStatus, Company};

use crate::config::MapConfig;

/// A bus joined with its line and operating company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusView {
    #[serde(flatten)]
    pub bus: Bus,
    #[serde(default)]
    pub line: Option<BusLine>,
    #[serde(default)]
    pub company: Option<Company>,
}

/// Marker severity on the fleet map, least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    Normal,
    Alert,
    Emergency,
}

impl VisualState {
    pub const HIGHEST: VisualState = VisualState::Emergency;

    pub fn pulses(&self) -> bool {
        !matches!(self, VisualState::Normal)
    }
}

impl From<BusStatus> for VisualState {
    fn from(status: BusStatus) -> Self {
        match status {
            BusStatus::Normal => VisualState::Normal,
            BusStatus::Alerta => VisualState::Alert,
            BusStatus::Emergencia => VisualState::Emergency,
        }
    }
}

/// Marker placement as percentages of the map panel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapPosition {
    pub x: f64,
    pub y: f64,
}

impl MapPosition {
    pub const CENTER: MapPosition = MapPosition { x: 50.0, y: 50.0 };

    /// Linear projection around the configured centre. A missing, zero or
    /// non-finite coordinate places the marker at the centre.
    pub fn project(latitude: Option<f64>, longitude: Option<f64>, map: &MapConfig) -> Self {
        let usable = |value: Option<f64>| value.filter(|v| v.is_finite() && *v != 0.0);
        match (usable(latitude), usable(longitude)) {
            (Some(lat), Some(lng)) => MapPosition {
                x: 50.0 + (lng - map.center_longitude) * map.scale,
                y: 50.0 - (lat - map.center_latitude) * map.scale,
            },
            _ => Self::CENTER,
        }
    }
}

impl BusView {
    pub fn id(&self) -> uuid::Uuid {
        self.bus.id
    }

    pub fn visual_state(&self) -> VisualState {
        self.bus.status.into()
    }

    pub fn map_position(&self, map: &MapConfig) -> MapPosition {
        MapPosition::project(self.bus.latitude, self.bus.longitude, map)
    }

    /// Label used by the camera view's bus selector.
    pub fn selector_label(&self) -> String {
        let company = self.company.as_ref().map(|c| c.name.as_str()).unwrap_or("—");
        let line = self.line.as_ref().map(|l| l.line_number.as_str()).unwrap_or("—");
        format!(
            "{} • Linha {} • Ônibus #{} ({})",
            company, line, self.bus.bus_number, self.bus.plate
        )
    }
}
