//! The delivery coordinator: single writer for robot status, waypoint queue
//! and rendered position.
//!
//! Operator intents, link events and animation steps all land here as method
//! calls from one task. Each handler commits its mutation completely or not
//! at all.

use courier_link::{ConnectionState, LinkEvent, LinkStats, RobotLink};
use courier_nav::{AnimationCfg, Geofence, PositionReconciler, ReconcilerOutput, Waypoint, WaypointId, WaypointQueue};
use courier_proto::{Coordinate, TelemetryFrame};
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::frontend::{MapRenderer, MarkerHandle, StatusDisplay};
use crate::status::{RobotMode, RobotStatus};

/// The destination the robot is currently driving to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trip {
    Waypoint { id: WaypointId, target: Coordinate },
    Base(Coordinate),
}

impl Trip {
    pub fn target(&self) -> Coordinate {
        match self {
            Trip::Waypoint { target, .. } => *target,
            Trip::Base(target) => *target,
        }
    }
}

pub struct Coordinator<R, D> {
    link: RobotLink,
    renderer: R,
    display: D,
    zone: Geofence,
    base: Coordinate,
    queue: WaypointQueue,
    reconciler: PositionReconciler,
    status: RobotStatus,
    trip: Option<Trip>,
    markers: HashMap<WaypointId, MarkerHandle>,
}

impl<R: MapRenderer, D: StatusDisplay> Coordinator<R, D> {
    pub fn new(
        link: RobotLink,
        mut renderer: R,
        mut display: D,
        base: Coordinate,
        zone: Geofence,
        animation: AnimationCfg,
    ) -> Self {
        renderer.draw_zone(&zone);
        renderer.set_robot_icon(base);
        display.show_connection(link.state());
        let status = RobotStatus::default();
        display.show_status(&status);

        Self {
            link,
            renderer,
            display,
            zone,
            base,
            queue: WaypointQueue::new(),
            reconciler: PositionReconciler::new(animation, base),
            status,
            trip: None,
            markers: HashMap::new(),
        }
    }

    // ----- read-only views -----

    pub fn status(&self) -> &RobotStatus {
        &self.status
    }

    pub fn queue(&self) -> &WaypointQueue {
        &self.queue
    }

    pub fn trip(&self) -> Option<Trip> {
        self.trip
    }

    pub fn connection(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn link_stats(&self) -> &LinkStats {
        self.link.stats()
    }

    pub fn robot_position(&self) -> Coordinate {
        self.reconciler.position()
    }

    pub fn is_animating(&self) -> bool {
        self.reconciler.is_animating()
    }

    pub fn zone(&self) -> &Geofence {
        &self.zone
    }

    pub fn base(&self) -> Coordinate {
        self.base
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn next_animation_step(&self) -> Option<Instant> {
        self.reconciler.next_step_at()
    }

    pub async fn next_link_event(&mut self) -> LinkEvent {
        self.link.next_event().await
    }

    // ----- operator intents -----

    /// Gates a map click through the zone and queues it. Dispatches right
    /// away when connected and nothing else is in flight.
    pub async fn place_waypoint(&mut self, at: Coordinate) -> Result<WaypointId, DispatchError> {
        if !self.zone.contains(at) {
            warn!("dispatch: rejected waypoint {} outside zone", at);
            return Err(DispatchError::OutsideZone(at));
        }
        let id = self.queue.enqueue(at);
        let marker = self.renderer.place_marker(at);
        self.markers.insert(id, marker);
        info!("dispatch: waypoint {} queued at {} ({} pending)", id, at, self.queue.len());

        if self.link.is_connected() && self.trip.is_none() && self.status.mode != RobotMode::Paused {
            if let Err(e) = self.dispatch_next().await {
                warn!("dispatch: waypoint {} stays queued: {}", id, e);
                self.display.alert(&e.to_string());
            }
        }
        Ok(id)
    }

    pub fn cancel_waypoint(&mut self, id: WaypointId) -> Result<(), DispatchError> {
        let wp = self.queue.cancel(id).ok_or(DispatchError::NotCancellable(id))?;
        self.drop_marker(wp.id);
        info!("dispatch: waypoint {} cancelled", wp.id);
        Ok(())
    }

    pub async fn start_delivery(&mut self) -> Result<(), DispatchError> {
        self.require_connected()?;
        let previous = std::mem::replace(&mut self.status.mode, RobotMode::InDelivery);
        if let Err(e) = self.dispatch_next().await {
            self.status.mode = previous;
            return Err(e);
        }
        self.display.show_status(&self.status);
        Ok(())
    }

    /// Local status only; there is no pause frame in the wire protocol.
    pub fn pause(&mut self) -> Result<(), DispatchError> {
        self.require_connected()?;
        self.set_mode(RobotMode::Paused);
        Ok(())
    }

    /// Sends the robot home and abandons every waypoint not yet reached.
    pub async fn return_to_base(&mut self) -> Result<(), DispatchError> {
        self.require_connected()?;
        self.link.send_command(self.base).await?;

        if let Some(wp) = self.queue.abandon_in_transit() {
            self.drop_marker(wp.id);
        }
        let cancelled = self.queue.clear();
        for wp in &cancelled {
            self.drop_marker(wp.id);
        }
        info!("dispatch: returning to base {}, {} waypoint(s) cancelled", self.base, cancelled.len());

        self.trip = Some(Trip::Base(self.base));
        self.reconciler.begin(self.base, Instant::now());
        self.set_mode(RobotMode::Returning);
        Ok(())
    }

    pub fn connect(&mut self) -> Result<(), DispatchError> {
        self.link.open()?;
        self.display.show_connection(self.link.state());
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<(), DispatchError> {
        self.require_connected()?;
        let result = self.link.close().await;
        if self.link.state() == ConnectionState::Disconnected {
            self.on_disconnected();
        }
        result.map_err(DispatchError::from)
    }

    pub async fn toggle_connection(&mut self) -> Result<(), DispatchError> {
        if self.link.is_connected() {
            self.disconnect().await
        } else {
            self.connect()
        }
    }

    /// Pushes connection, status and queue to the display in one go.
    pub fn refresh_display(&mut self) {
        self.display.show_connection(self.link.state());
        self.display.show_link_stats(self.link.stats());
        self.display.show_status(&self.status);
        self.show_queue();
    }

    pub fn show_queue(&mut self) {
        let pending: Vec<Waypoint> = self.queue.pending().cloned().collect();
        self.display.show_queue(self.queue.in_transit(), &pending);
    }

    // ----- link events -----

    pub async fn on_link_event(&mut self, ev: LinkEvent) {
        match ev {
            LinkEvent::Connected => {
                info!("dispatch: robot link up ({})", self.link.port_name());
                self.display.show_connection(self.link.state());
            }
            LinkEvent::Disconnected => self.on_disconnected(),
            LinkEvent::Telemetry(frame) => self.on_telemetry(frame).await,
            LinkEvent::DecodeError(e) => {
                warn!("dispatch: ignoring malformed telemetry: {}", e);
            }
            LinkEvent::LinkError(e) => {
                error!("dispatch: robot link failed: {}", e);
                self.display.alert(&format!("Robot link error: {}", e));
                if self.link.is_connected() {
                    if let Err(e) = self.link.close().await {
                        warn!("dispatch: close after link error: {}", e);
                    }
                }
                self.on_disconnected();
            }
        }
    }

    async fn on_telemetry(&mut self, frame: TelemetryFrame) {
        self.status.merge(&frame);
        if let Some(loc) = frame.location {
            if self.reconciler.apply_telemetry(loc) {
                debug!("dispatch: animation superseded by telemetry at {}", loc);
            }
            self.renderer.set_robot_icon(loc);
            self.on_arrival(loc, frame.status.is_some()).await;
        }
        self.display.show_status(&self.status);
    }

    /// Advances the local animation by one step.
    pub async fn on_animation_step(&mut self) {
        match self.reconciler.step() {
            Some(ReconcilerOutput::Moved(c)) => self.renderer.set_robot_icon(c),
            Some(ReconcilerOutput::TargetReached(c)) => {
                self.renderer.set_robot_icon(c);
                self.on_arrival(c, false).await;
                self.display.show_status(&self.status);
            }
            None => {}
        }
    }

    // ----- internals -----

    /// `mode_reported` is set when the same telemetry frame carried a status,
    /// which then takes precedence over the local Idle transition.
    async fn on_arrival(&mut self, at: Coordinate, mode_reported: bool) {
        let Some(trip) = self.trip else { return };
        if trip.target() != at {
            return;
        }
        self.trip = None;

        match trip {
            Trip::Waypoint { id, .. } => {
                if self.queue.mark_reached(id).is_some() {
                    info!("dispatch: waypoint {} reached at {}", id, at);
                }
                self.drop_marker(id);

                if self.queue.is_empty() {
                    if !mode_reported {
                        self.status.mode = RobotMode::Idle;
                    }
                } else if self.status.mode != RobotMode::Paused {
                    if let Err(e) = self.dispatch_next().await {
                        warn!("dispatch: next waypoint not sent: {}", e);
                        self.display.alert(&e.to_string());
                    }
                }
            }
            Trip::Base(_) => {
                info!("dispatch: back at base {}", at);
                let paused = self.status.mode == RobotMode::Paused;
                if !mode_reported && !paused {
                    self.status.mode = RobotMode::Idle;
                }
                // clicks made during the return run once the robot is home
                if !paused && !self.queue.is_empty() {
                    if let Err(e) = self.dispatch_next().await {
                        warn!("dispatch: next waypoint not sent: {}", e);
                        self.display.alert(&e.to_string());
                    }
                }
            }
        }
    }

    /// Sends the queue head and only then moves it in flight, so a failed
    /// write leaves the queue untouched.
    async fn dispatch_next(&mut self) -> Result<Option<WaypointId>, DispatchError> {
        if self.trip.is_some() {
            return Ok(None);
        }
        let Some(next) = self.queue.peek_next().map(|w| w.coordinate) else {
            return Ok(None);
        };
        self.link.send_command(next).await?;

        let Some(wp) = self.queue.dispatch_next() else {
            return Ok(None);
        };
        let from = self.reconciler.position();
        info!(
            "dispatch: waypoint {} in transit to {} ({:.2} m)",
            wp.id,
            wp.coordinate,
            from.distance_m(&wp.coordinate)
        );
        self.trip = Some(Trip::Waypoint { id: wp.id, target: wp.coordinate });
        self.reconciler.begin(wp.coordinate, Instant::now());
        if matches!(self.status.mode, RobotMode::Unknown | RobotMode::Idle) {
            self.set_mode(RobotMode::Moving);
        }
        Ok(Some(wp.id))
    }

    fn on_disconnected(&mut self) {
        self.reconciler.cancel();
        if let Some(Trip::Waypoint { .. }) = self.trip {
            if let Some(id) = self.queue.requeue_in_transit() {
                info!("dispatch: waypoint {} back in queue after disconnect", id);
            }
        }
        self.trip = None;
        self.status.reset();
        self.display.show_connection(self.link.state());
        self.display.show_status(&self.status);
    }

    fn require_connected(&self) -> Result<(), DispatchError> {
        if self.link.is_connected() {
            Ok(())
        } else {
            Err(DispatchError::NotConnected)
        }
    }

    fn set_mode(&mut self, mode: RobotMode) {
        debug!("dispatch: mode {} -> {}", self.status.mode, mode);
        self.status.mode = mode;
        self.display.show_status(&self.status);
    }

    fn drop_marker(&mut self, id: WaypointId) {
        if let Some(marker) = self.markers.remove(&id) {
            self.renderer.remove_marker(marker);
        }
    }
}
