//! In-process stand-in for the robot firmware, for bench runs without hardware.

use courier_proto::{encode_frame, Coordinate, FrameDecoder, MoveCommand, TelemetryFrame};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::port::{Port, PortOpener};

#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    position: Coordinate,
    battery: f64,
    travel: Duration,
    drain_per_trip: f64,
}

impl SimulatedRobot {
    pub fn new(position: Coordinate) -> Self {
        Self { position, battery: 100.0, travel: Duration::from_millis(1500), drain_per_trip: 1.0 }
    }

    pub fn with_travel(mut self, travel: Duration) -> Self {
        self.travel = travel;
        self
    }

    /// Serves one connection: reports `Moving` on every command, then the
    /// target location with `Idle` after the travel time. Commands are
    /// handled one at a time.
    pub async fn run<S: AsyncRead + AsyncWrite + Unpin>(mut self, port: S) -> io::Result<()> {
        let (mut rd, mut wr) = tokio::io::split(port);
        let mut decoder = FrameDecoder::<MoveCommand>::default();
        let mut buf = [0u8; 512];

        self.report(&mut wr, Some("Idle"), true).await?;

        loop {
            let n = rd.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            for cmd in decoder.feed(&buf[..n]) {
                let cmd = match cmd {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("sim: bad command: {}", e);
                        continue;
                    }
                };
                debug!("sim: moving to ({}, {})", cmd.lat, cmd.lng);
                self.report(&mut wr, Some("Moving"), false).await?;
                tokio::time::sleep(self.travel).await;
                self.position = cmd.into();
                self.battery = (self.battery - self.drain_per_trip).max(0.0);
                self.report(&mut wr, Some("Idle"), true).await?;
            }
        }
    }

    async fn report<W: AsyncWrite + Unpin>(&self, wr: &mut W, status: Option<&str>, with_location: bool) -> io::Result<()> {
        let frame = TelemetryFrame {
            battery: Some(self.battery),
            status: status.map(str::to_string),
            location: with_location.then_some(self.position),
        };
        let bytes = encode_frame(&frame)?;
        wr.write_all(&bytes).await?;
        wr.flush().await
    }
}

/// Opens a fresh simulated robot per connect.
#[derive(Debug, Clone)]
pub struct SimulatedOpener {
    robot: SimulatedRobot,
}

impl SimulatedOpener {
    pub fn new(robot: SimulatedRobot) -> Self {
        Self { robot }
    }
}

impl PortOpener for SimulatedOpener {
    fn describe(&self) -> String {
        "sim://robot".into()
    }

    fn open(&mut self) -> io::Result<Box<dyn Port>> {
        let (host, robot_end) = tokio::io::duplex(4096);
        let robot = self.robot.clone();
        tokio::spawn(async move {
            if let Err(e) = robot.run(robot_end).await {
                debug!("sim: robot connection ended: {}", e);
            }
        });
        Ok(Box::new(host))
    }
}
