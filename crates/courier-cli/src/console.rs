//! Text frontend for `courier run`: the map and status panel are printed
//! lines, operator actions are typed commands on stdin.

use courier_dispatch::{MapRenderer, MarkerHandle, OperatorIntent, RobotStatus, StatusDisplay};
use courier_link::{ConnectionState, LinkStats};
use courier_nav::{Geofence, Waypoint};
use courier_proto::Coordinate;
use std::io::{self, BufRead, Write};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub const HELP: &str = "commands: click <lat> <lng> | cancel <id> | start | pause | return | \
connect | disconnect | toggle | status | quit";

pub struct ConsoleMap<W> {
    out: W,
    next_marker: u64,
}

impl ConsoleMap<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleMap<W> {
    pub fn new(out: W) -> Self {
        Self { out, next_marker: 0 }
    }
}

impl<W: Write> MapRenderer for ConsoleMap<W> {
    fn draw_zone(&mut self, zone: &Geofence) {
        let (ns, ew) = zone.extent_m();
        let _ = writeln!(
            self.out,
            "zone: {} .. {} ({:.1} m x {:.1} m)",
            zone.south_west(),
            zone.north_east(),
            ns,
            ew
        );
    }

    fn place_marker(&mut self, at: Coordinate) -> MarkerHandle {
        self.next_marker += 1;
        let marker = MarkerHandle(self.next_marker);
        let _ = writeln!(self.out, "marker {} placed at {}", marker.0, at);
        marker
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        let _ = writeln!(self.out, "marker {} removed", marker.0);
    }

    // Every animation step lands here; keep it out of the console.
    fn set_robot_icon(&mut self, at: Coordinate) {
        debug!("console: robot icon at {}", at);
    }
}

pub struct ConsoleStatus<W> {
    out: W,
    last_line: Option<String>,
}

impl ConsoleStatus<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleStatus<W> {
    pub fn new(out: W) -> Self {
        Self { out, last_line: None }
    }
}

pub fn status_line(status: &RobotStatus) -> String {
    let mut line = format!(
        "status: {} | battery: {} | location: {}",
        status.mode,
        status.battery_text(),
        status.location_text()
    );
    if let Some(at) = status.last_telemetry {
        line.push_str(&format!(" | updated {}", at));
    }
    line
}

pub fn link_line(stats: &LinkStats) -> String {
    let Some(up) = stats.uptime() else {
        return "link: down".into();
    };
    let last = match stats.last_frame_age() {
        Some(age) => format!("{:.1}s ago", age.as_secs_f64()),
        None => "never".into(),
    };
    format!(
        "link: up {}s | last frame {} | rx {} | tx {} | decode errors {}",
        up.as_secs(),
        last,
        stats.frames_rx,
        stats.commands_tx,
        stats.decode_errors
    )
}

impl<W: Write> StatusDisplay for ConsoleStatus<W> {
    fn show_status(&mut self, status: &RobotStatus) {
        let line = status_line(status);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        let _ = writeln!(self.out, "{}", line);
        self.last_line = Some(line);
    }

    fn show_connection(&mut self, state: ConnectionState) {
        let _ = writeln!(self.out, "connection: {}", state);
    }

    fn show_link_stats(&mut self, stats: &LinkStats) {
        let _ = writeln!(self.out, "{}", link_line(stats));
    }

    fn show_queue(&mut self, in_transit: Option<&Waypoint>, pending: &[Waypoint]) {
        match in_transit {
            Some(wp) => {
                let _ = writeln!(self.out, "in transit: {} -> {}", wp.id, wp.coordinate);
            }
            None => {
                let _ = writeln!(self.out, "in transit: none");
            }
        }
        if pending.is_empty() {
            let _ = writeln!(self.out, "queue: empty");
        }
        for (i, wp) in pending.iter().enumerate() {
            let _ = writeln!(self.out, "queue[{}]: {} -> {}", i, wp.id, wp.coordinate);
        }
    }

    fn alert(&mut self, message: &str) {
        let _ = writeln!(self.out, "ALERT: {}", message);
    }
}

/// Feeds stdin lines to the session as intents until EOF or `quit`.
/// Unparseable lines are answered on stderr and skipped. Runs on a plain
/// thread so a pending read never holds up runtime shutdown.
pub fn spawn_operator_input(tx: mpsc::Sender<OperatorIntent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("console: stdin read failed: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<OperatorIntent>() {
                Ok(OperatorIntent::Quit) => break,
                Ok(intent) => {
                    if tx.blocking_send(intent).is_err() {
                        return;
                    }
                }
                Err(e) => eprintln!("? {}\n{}", e, HELP),
            }
        }
        let _ = tx.blocking_send(OperatorIntent::Quit);
    })
}
