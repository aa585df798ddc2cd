use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// Host to robot: drive to this point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveCommand {
    pub lat: f64,
    pub lng: f64,
}

impl From<Coordinate> for MoveCommand {
    fn from(c: Coordinate) -> Self {
        Self { lat: c.lat, lng: c.lng }
    }
}

impl From<MoveCommand> for Coordinate {
    fn from(c: MoveCommand) -> Self {
        Coordinate::new(c.lat, c.lng)
    }
}

/// Robot to host. Every field is optional; a frame may carry any subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
}

impl TelemetryFrame {
    pub fn is_empty(&self) -> bool {
        self.battery.is_none() && self.status.is_none() && self.location.is_none()
    }
}
