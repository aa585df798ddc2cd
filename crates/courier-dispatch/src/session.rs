//! Operator session loop: one task owns the coordinator and feeds it
//! operator intents, link events and animation ticks as they come due.

use courier_link::ConnectionState;
use courier_nav::WaypointId;
use courier_proto::Coordinate;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};

use crate::coordinator::Coordinator;
use crate::frontend::{MapRenderer, StatusDisplay};

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorIntent {
    PlaceWaypoint(Coordinate),
    CancelWaypoint(WaypointId),
    StartDelivery,
    Pause,
    ReturnToBase,
    Connect,
    Disconnect,
    ToggleConnection,
    ShowStatus,
    Quit,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseIntentError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for OperatorIntent {
    type Err = ParseIntentError;

    /// Console syntax: `click <lat> <lng>`, `cancel <id>`, `start`, `pause`,
    /// `return`, `connect`, `disconnect`, `toggle`, `status`, `quit`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let cmd = words.next().ok_or(ParseIntentError::Empty)?.to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let intent = match (cmd.as_str(), args.as_slice()) {
            ("click", [lat, lng]) => {
                let usage = ParseIntentError::Usage("click <lat> <lng>");
                let lat: f64 = lat.parse().map_err(|_| usage.clone())?;
                let lng: f64 = lng.parse().map_err(|_| usage.clone())?;
                let at = Coordinate::new(lat, lng);
                if !at.is_valid() {
                    return Err(usage);
                }
                OperatorIntent::PlaceWaypoint(at)
            }
            ("click", _) => return Err(ParseIntentError::Usage("click <lat> <lng>")),
            ("cancel", [id]) => {
                let id = id.trim_start_matches('#');
                let n = id.parse().map_err(|_| ParseIntentError::Usage("cancel <id>"))?;
                OperatorIntent::CancelWaypoint(WaypointId(n))
            }
            ("cancel", _) => return Err(ParseIntentError::Usage("cancel <id>")),
            ("start", []) => OperatorIntent::StartDelivery,
            ("pause", []) => OperatorIntent::Pause,
            ("return", []) => OperatorIntent::ReturnToBase,
            ("connect", []) => OperatorIntent::Connect,
            ("disconnect", []) => OperatorIntent::Disconnect,
            ("toggle", []) => OperatorIntent::ToggleConnection,
            ("status", []) => OperatorIntent::ShowStatus,
            ("quit" | "exit", []) => OperatorIntent::Quit,
            _ => return Err(ParseIntentError::Unknown(line.trim().to_string())),
        };
        Ok(intent)
    }
}

impl<R: MapRenderer, D: StatusDisplay> Coordinator<R, D> {
    /// Applies one intent. Rejections go to the operator as an alert and
    /// leave every piece of state as it was.
    pub async fn handle_intent(&mut self, intent: OperatorIntent) {
        let result = match intent {
            OperatorIntent::PlaceWaypoint(at) => self.place_waypoint(at).await.map(|_| ()),
            OperatorIntent::CancelWaypoint(id) => self.cancel_waypoint(id),
            OperatorIntent::StartDelivery => self.start_delivery().await,
            OperatorIntent::Pause => self.pause(),
            OperatorIntent::ReturnToBase => self.return_to_base().await,
            OperatorIntent::Connect => self.connect(),
            OperatorIntent::Disconnect => self.disconnect().await,
            OperatorIntent::ToggleConnection => self.toggle_connection().await,
            OperatorIntent::ShowStatus => {
                self.refresh_display();
                Ok(())
            }
            OperatorIntent::Quit => Ok(()),
        };
        if let Err(e) = result {
            warn!("dispatch: {:?} rejected: {}", e.kind(), e);
            self.display_mut().alert(&e.to_string());
        }
    }
}

/// Runs until the operator quits or the intent channel closes, then releases
/// the robot link.
pub async fn run_session<R, D>(coord: &mut Coordinator<R, D>, mut intents: mpsc::Receiver<OperatorIntent>)
where
    R: MapRenderer,
    D: StatusDisplay,
{
    info!("dispatch: session started, base {}", coord.base());
    loop {
        let deadline = coord.next_animation_step();
        tokio::select! {
            intent = intents.recv() => match intent {
                None | Some(OperatorIntent::Quit) => break,
                Some(intent) => coord.handle_intent(intent).await,
            },
            ev = coord.next_link_event() => coord.on_link_event(ev).await,
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                coord.on_animation_step().await;
            }
        }
    }

    if coord.connection() == ConnectionState::Connected {
        if let Err(e) = coord.disconnect().await {
            warn!("dispatch: disconnect on exit: {}", e);
        }
    }
    info!("dispatch: session ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::RobotMode;
    use crate::testing::{RecordingDisplay, RecordingMap};
    use courier_link::sim::{SimulatedOpener, SimulatedRobot};
    use courier_link::{MemoryOpener, RobotLink};
    use courier_nav::{AnimationCfg, Geofence};
    use std::time::Duration;

    fn coordinator(link: RobotLink) -> Coordinator<RecordingMap, RecordingDisplay> {
        Coordinator::new(
            link,
            RecordingMap::default(),
            RecordingDisplay::default(),
            Coordinate::new(0.0, 0.0),
            Geofence::new(0.0, 0.0, 10.0, 10.0),
            AnimationCfg { steps: 5, duration_ms: 50 },
        )
    }

    #[test]
    fn parses_console_commands() {
        assert_eq!("click 1.5 -2".parse::<OperatorIntent>(), Ok(OperatorIntent::PlaceWaypoint(Coordinate::new(1.5, -2.0))));
        assert_eq!("cancel #3".parse::<OperatorIntent>(), Ok(OperatorIntent::CancelWaypoint(WaypointId(3))));
        assert_eq!("  START ".parse::<OperatorIntent>(), Ok(OperatorIntent::StartDelivery));
        assert_eq!("return".parse::<OperatorIntent>(), Ok(OperatorIntent::ReturnToBase));
        assert_eq!("toggle".parse::<OperatorIntent>(), Ok(OperatorIntent::ToggleConnection));
        assert_eq!("exit".parse::<OperatorIntent>(), Ok(OperatorIntent::Quit));
    }

    #[test]
    fn rejects_bad_console_input() {
        assert_eq!("".parse::<OperatorIntent>(), Err(ParseIntentError::Empty));
        assert_eq!(
            "click 1".parse::<OperatorIntent>(),
            Err(ParseIntentError::Usage("click <lat> <lng>"))
        );
        assert_eq!(
            "click 91 0".parse::<OperatorIntent>(),
            Err(ParseIntentError::Usage("click <lat> <lng>"))
        );
        assert_eq!(
            "fly away".parse::<OperatorIntent>(),
            Err(ParseIntentError::Unknown("fly away".into()))
        );
    }

    #[tokio::test]
    async fn rejected_intent_raises_alert() {
        let mut coord = coordinator(RobotLink::new(MemoryOpener::new("none")));
        let (tx, rx) = mpsc::channel(8);
        tx.send(OperatorIntent::StartDelivery).await.unwrap();
        tx.send(OperatorIntent::PlaceWaypoint(Coordinate::new(20.0, 20.0))).await.unwrap();
        tx.send(OperatorIntent::Quit).await.unwrap();

        run_session(&mut coord, rx).await;

        let alerts = &coord.display().alerts;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0], "Please connect to the robot first!");
        assert!(alerts[1].starts_with("Please select a point within the designated area"));
        assert_eq!(coord.status().mode, RobotMode::Unknown);
    }

    #[tokio::test]
    async fn delivers_a_waypoint_to_the_simulated_robot() {
        let robot = SimulatedRobot::new(Coordinate::new(0.0, 0.0)).with_travel(Duration::from_millis(20));
        let mut coord = coordinator(RobotLink::new(SimulatedOpener::new(robot)));
        let (tx, rx) = mpsc::channel(8);

        let operator = tokio::spawn(async move {
            tx.send(OperatorIntent::Connect).await.unwrap();
            tx.send(OperatorIntent::PlaceWaypoint(Coordinate::new(5.0, 5.0))).await.unwrap();
            tokio::time::sleep(Duration::from_millis(400)).await;
            tx.send(OperatorIntent::Quit).await.unwrap();
        });

        run_session(&mut coord, rx).await;
        operator.await.unwrap();

        assert!(coord.queue().is_empty());
        assert!(coord.queue().in_transit().is_none());
        assert!(coord.trip().is_none());
        assert!(coord.renderer().markers.is_empty());
        assert!(coord.renderer().robot_trail.contains(&Coordinate::new(5.0, 5.0)));
        assert_eq!(coord.link_stats().commands_tx, 1);
        assert_eq!(coord.connection(), ConnectionState::Disconnected);
        assert!(coord.display().alerts.is_empty());
    }
}
