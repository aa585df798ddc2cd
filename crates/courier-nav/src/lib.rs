pub mod doctor;
pub mod geofence;
pub mod origin;
pub mod queue;
pub mod reconcile;

pub use geofence::{Geofence, ZoneCfg};
pub use queue::{Waypoint, WaypointId, WaypointQueue, WaypointState};
pub use reconcile::{AnimationCfg, PositionReconciler, ReconcilerOutput};
