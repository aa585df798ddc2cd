//! Seams to the operator-facing collaborators. The coordinator only pushes
//! into these; it never reads state back from them.

use courier_link::{ConnectionState, LinkStats};
use courier_nav::{Geofence, Waypoint};
use courier_proto::Coordinate;

use crate::status::RobotStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

pub trait MapRenderer {
    fn draw_zone(&mut self, zone: &Geofence);
    fn place_marker(&mut self, at: Coordinate) -> MarkerHandle;
    fn remove_marker(&mut self, marker: MarkerHandle);
    fn set_robot_icon(&mut self, at: Coordinate);
}

pub trait StatusDisplay {
    fn show_status(&mut self, status: &RobotStatus);
    fn show_connection(&mut self, state: ConnectionState);
    /// Uptime, last frame age and counters of the current link.
    fn show_link_stats(&mut self, stats: &LinkStats);
    fn show_queue(&mut self, in_transit: Option<&Waypoint>, pending: &[Waypoint]);
    /// Blocking, user-visible message for a rejected action or a link failure.
    fn alert(&mut self, message: &str);
}
