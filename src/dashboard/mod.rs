// Dashboard state: bounded snapshot window + the task that owns it
pub mod controller; // single consumer of polls, manual refreshes and live inserts
pub mod window;     // bounded oldest-to-newest run of snapshots

pub use controller::{spawn, DashboardHandle, DashboardModel, DashboardOptions, DashboardState, LoadOutcome};
pub use window::SnapshotWindow;
