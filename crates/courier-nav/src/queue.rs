use courier_proto::Coordinate;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub u64);

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointState {
    /// Click accepted but not yet queued. `enqueue` commits Pending to
    /// Enqueued in one step, so a stored waypoint is never observed here.
    Pending,
    Enqueued,
    InTransit,
    Reached,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,
    pub coordinate: Coordinate,
    pub state: WaypointState,
}

/// FIFO of operator waypoints with a single in-flight slot.
///
/// The robot accepts one destination at a time, so at most one waypoint is
/// ever `InTransit`. Duplicate coordinates are queued independently.
#[derive(Debug, Default)]
pub struct WaypointQueue {
    next_id: u64,
    pending: VecDeque<Waypoint>,
    in_transit: Option<Waypoint>,
}

impl WaypointQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, coordinate: Coordinate) -> WaypointId {
        self.next_id += 1;
        let id = WaypointId(self.next_id);
        self.pending.push_back(Waypoint { id, coordinate, state: WaypointState::Enqueued });
        id
    }

    pub fn peek_next(&self) -> Option<&Waypoint> {
        self.pending.front()
    }

    /// Pops the head into the in-flight slot. Empty when the queue is empty or
    /// a waypoint is already in transit.
    pub fn dispatch_next(&mut self) -> Option<Waypoint> {
        if self.in_transit.is_some() {
            return None;
        }
        let mut wp = self.pending.pop_front()?;
        wp.state = WaypointState::InTransit;
        self.in_transit = Some(wp.clone());
        Some(wp)
    }

    /// Unknown ids are ignored so late or repeated arrival reports are harmless.
    pub fn mark_reached(&mut self, id: WaypointId) -> Option<Waypoint> {
        let mut wp = if self.in_transit.as_ref().map(|w| w.id) == Some(id) {
            self.in_transit.take()?
        } else {
            let idx = self.pending.iter().position(|w| w.id == id)?;
            self.pending.remove(idx)?
        };
        wp.state = WaypointState::Reached;
        Some(wp)
    }

    /// Cancels one waypoint that has not been dispatched yet.
    pub fn cancel(&mut self, id: WaypointId) -> Option<Waypoint> {
        let idx = self.pending.iter().position(|w| w.id == id)?;
        let mut wp = self.pending.remove(idx)?;
        wp.state = WaypointState::Cancelled;
        Some(wp)
    }

    /// Cancels every waypoint still waiting for dispatch.
    pub fn clear(&mut self) -> Vec<Waypoint> {
        self.pending
            .drain(..)
            .map(|mut wp| {
                wp.state = WaypointState::Cancelled;
                wp
            })
            .collect()
    }

    /// Drops the in-flight waypoint without reaching it (robot redirected).
    pub fn abandon_in_transit(&mut self) -> Option<Waypoint> {
        let mut wp = self.in_transit.take()?;
        wp.state = WaypointState::Cancelled;
        Some(wp)
    }

    /// Puts the in-flight waypoint back at the head so it is dispatched again.
    pub fn requeue_in_transit(&mut self) -> Option<WaypointId> {
        let mut wp = self.in_transit.take()?;
        wp.state = WaypointState::Enqueued;
        let id = wp.id;
        self.pending.push_front(wp);
        Some(id)
    }

    pub fn in_transit(&self) -> Option<&Waypoint> {
        self.in_transit.as_ref()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Waypoint> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
