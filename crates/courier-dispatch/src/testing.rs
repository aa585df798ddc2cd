use courier_link::{ConnectionState, LinkStats, Port, PortOpener};
use courier_nav::{Geofence, Waypoint};
use courier_proto::Coordinate;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::frontend::{MapRenderer, MarkerHandle, StatusDisplay};
use crate::status::RobotStatus;

#[derive(Debug, Default)]
pub struct RecordingMap {
    next: u64,
    pub zone: Option<Geofence>,
    pub markers: Vec<(MarkerHandle, Coordinate)>,
    pub robot_trail: Vec<Coordinate>,
}

impl MapRenderer for RecordingMap {
    fn draw_zone(&mut self, zone: &Geofence) {
        self.zone = Some(*zone);
    }

    fn place_marker(&mut self, at: Coordinate) -> MarkerHandle {
        self.next += 1;
        let h = MarkerHandle(self.next);
        self.markers.push((h, at));
        h
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        self.markers.retain(|(h, _)| *h != marker);
    }

    fn set_robot_icon(&mut self, at: Coordinate) {
        self.robot_trail.push(at);
    }
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub last_status: Option<RobotStatus>,
    pub status_updates: usize,
    pub connection: Option<ConnectionState>,
    pub connection_updates: usize,
    pub link_stats: Option<LinkStats>,
    pub queue_shown: usize,
    pub alerts: Vec<String>,
}

impl StatusDisplay for RecordingDisplay {
    fn show_status(&mut self, status: &RobotStatus) {
        self.last_status = Some(status.clone());
        self.status_updates += 1;
    }

    fn show_connection(&mut self, state: ConnectionState) {
        self.connection = Some(state);
        self.connection_updates += 1;
    }

    fn show_link_stats(&mut self, stats: &LinkStats) {
        self.link_stats = Some(stats.clone());
    }

    fn show_queue(&mut self, _in_transit: Option<&Waypoint>, _pending: &[Waypoint]) {
        self.queue_shown += 1;
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

/// A port whose reads always fail, like a serial adapter pulled mid-session.
/// Writes are accepted and dropped.
pub struct UnpluggedPort;

impl AsyncRead for UnpluggedPort {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")))
    }
}

impl AsyncWrite for UnpluggedPort {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub struct UnpluggedOpener;

impl PortOpener for UnpluggedOpener {
    fn describe(&self) -> String {
        "unplugged://robot".into()
    }

    fn open(&mut self) -> io::Result<Box<dyn Port>> {
        Ok(Box::new(UnpluggedPort))
    }
}
