use courier_proto::{Coordinate, TelemetryFrame};
use std::fmt;
use time::OffsetDateTime;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RobotMode {
    #[default]
    Unknown,
    Idle,
    Moving,
    InDelivery,
    Paused,
    Returning,
    /// A status string from the robot that maps to none of the above.
    Reported(String),
}

impl RobotMode {
    pub fn from_report(s: &str) -> Self {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "" | "null" | "unknown" => RobotMode::Unknown,
            "idle" => RobotMode::Idle,
            "moving" => RobotMode::Moving,
            "indelivery" | "delivering" => RobotMode::InDelivery,
            "paused" => RobotMode::Paused,
            "returning" => RobotMode::Returning,
            _ => RobotMode::Reported(s.trim().to_string()),
        }
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotMode::Unknown => f.write_str("Unknown"),
            RobotMode::Idle => f.write_str("Idle"),
            RobotMode::Moving => f.write_str("Moving"),
            RobotMode::InDelivery => f.write_str("In Delivery"),
            RobotMode::Paused => f.write_str("Paused"),
            RobotMode::Returning => f.write_str("Returning"),
            RobotMode::Reported(s) => f.write_str(s),
        }
    }
}

/// What the operator sees as the robot's current state. Written by local
/// intents and by telemetry; a telemetry field overwrites whatever was there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotStatus {
    pub mode: RobotMode,
    pub battery: Option<f64>,
    pub location: Option<Coordinate>,
    pub last_telemetry: Option<OffsetDateTime>,
}

impl RobotStatus {
    /// Applies every field present in `frame` and leaves the rest untouched.
    pub fn merge(&mut self, frame: &TelemetryFrame) {
        if let Some(b) = frame.battery.filter(|b| b.is_finite()) {
            self.battery = Some(b.clamp(0.0, 100.0));
        }
        if let Some(s) = &frame.status {
            self.mode = RobotMode::from_report(s);
        }
        if let Some(loc) = frame.location {
            self.location = Some(loc);
        }
        self.last_telemetry = Some(OffsetDateTime::now_utc());
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn battery_text(&self) -> String {
        match self.battery {
            Some(b) => format!("{}%", b),
            None => "Unknown".into(),
        }
    }

    pub fn location_text(&self) -> String {
        match self.location {
            Some(c) => c.to_string(),
            None => "Unknown".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_only_frame_touches_battery_only() {
        let mut st = RobotStatus {
            mode: RobotMode::Moving,
            location: Some(Coordinate::new(1.0, 1.0)),
            ..RobotStatus::default()
        };
        st.merge(&serde_json::from_str(r#"{"battery": 42}"#).unwrap());
        assert_eq!(st.battery, Some(42.0));
        assert_eq!(st.mode, RobotMode::Moving);
        assert_eq!(st.location, Some(Coordinate::new(1.0, 1.0)));
        assert!(st.last_telemetry.is_some());
    }

    #[test]
    fn status_strings_map_to_modes() {
        assert_eq!(RobotMode::from_report("Idle"), RobotMode::Idle);
        assert_eq!(RobotMode::from_report("In Delivery"), RobotMode::InDelivery);
        assert_eq!(RobotMode::from_report("in_delivery"), RobotMode::InDelivery);
        assert_eq!(RobotMode::from_report("RETURNING"), RobotMode::Returning);
        assert_eq!(RobotMode::from_report("Null"), RobotMode::Unknown);
        assert_eq!(
            RobotMode::from_report(" Charging "),
            RobotMode::Reported("Charging".into())
        );
        assert_eq!(RobotMode::InDelivery.to_string(), "In Delivery");
    }

    #[test]
    fn battery_is_clamped_and_nan_ignored() {
        let mut st = RobotStatus::default();
        st.merge(&TelemetryFrame { battery: Some(140.0), ..TelemetryFrame::default() });
        assert_eq!(st.battery, Some(100.0));
        st.merge(&TelemetryFrame { battery: Some(f64::NAN), ..TelemetryFrame::default() });
        assert_eq!(st.battery, Some(100.0));
        assert_eq!(st.battery_text(), "100%");
    }

    #[test]
    fn reset_clears_everything() {
        let mut st = RobotStatus::default();
        st.merge(&serde_json::from_str(r#"{"battery":5,"status":"Moving","location":{"lat":1,"lng":2}}"#).unwrap());
        st.reset();
        assert_eq!(st, RobotStatus::default());
        assert_eq!(st.location_text(), "Unknown");
    }
}
