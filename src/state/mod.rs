//! Application state shared by the HTTP routes and websocket connections
//! - Project registry snapshot
//! - Handle to the process supervisor task
//! - Open realtime connections
//!
//! Cheap to clone, every field is reference counted

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::process::SupervisorHandle;
use crate::projects::ProjectRegistry;
use crate::websocket::ConnectionHub;

#[derive(Clone)]
pub struct AppState {
    projects: Arc<ProjectRegistry>, // Read-only snapshot, swapped on reload
    supervisor: SupervisorHandle,   // Sole writer of the live-process map
    hub: ConnectionHub,             // Every connected client
    static_dir: Arc<PathBuf>,       // UI assets
}

impl AppState {
    pub fn new(
        projects: Arc<ProjectRegistry>,
        supervisor: SupervisorHandle,
        hub: ConnectionHub,
        static_dir: PathBuf,
    ) -> Self {
        Self {
            projects,
            supervisor,
            hub,
            static_dir: Arc::new(static_dir),
        }
    }

    pub fn projects(&self) -> &Arc<ProjectRegistry> {
        &self.projects
    }

    pub fn supervisor(&self) -> &SupervisorHandle {
        &self.supervisor
    }

    pub fn hub(&self) -> &ConnectionHub {
        &self.hub
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }
}
