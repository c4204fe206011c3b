mod registry;
mod scheduler;

pub use registry::{FlightGuard, TaskRegistry, TaskState};
pub use scheduler::{PanelTask, Poller, PollerHandle};
