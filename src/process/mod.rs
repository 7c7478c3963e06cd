/// Process management for project commands
/// Tracks at most one live OS process per project path and streams its
/// output back to whoever started it

pub mod output;
pub mod platform;
pub mod registry;
pub mod supervisor;

pub use registry::{LiveEntry, ProcessRegistry};
pub use supervisor::{Supervisor, SupervisorHandle};
