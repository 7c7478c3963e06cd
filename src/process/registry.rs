use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::protocol::LiveProcessInfo;

/// A process currently running for a project
#[derive(Debug, Clone)]
pub struct LiveEntry {
    pub id: Uuid,
    pub project_path: String,
    pub project_name: String,
    pub pid: u32,
    pub command: String,
    pub started_at: DateTime<Utc>,
}

impl LiveEntry {
    pub fn new(project_path: &str, project_name: &str, pid: u32, command: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_path: project_path.to_string(),
            project_name: project_name.to_string(),
            pid,
            command: command.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn info(&self) -> LiveProcessInfo {
        LiveProcessInfo {
            id: self.id.to_string(),
            name: self.project_name.clone(),
            path: self.project_path.clone(),
            pid: self.pid,
            command: self.command.clone(),
            started_at: self.started_at,
        }
    }
}

/// Registry of live processes, at most one per project path.
///
/// Owned by the supervisor task and only ever touched from there, so it
/// needs no locking.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    processes: HashMap<String, LiveEntry>, // project_path -> entry
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, project_path: &str) -> bool {
        self.processes.contains_key(project_path)
    }

    pub fn get(&self, project_path: &str) -> Option<&LiveEntry> {
        self.processes.get(project_path)
    }

    /// Adds an entry for a freshly spawned process. Returns the entry back
    /// if the path is already occupied.
    pub fn register(&mut self, entry: LiveEntry) -> Result<(), LiveEntry> {
        if self.processes.contains_key(&entry.project_path) {
            return Err(entry);
        }
        info!(
            "Registered {} (PID: {}) for {}",
            entry.project_name, entry.pid, entry.project_path
        );
        self.processes.insert(entry.project_path.clone(), entry);
        Ok(())
    }

    /// Removes the entry only if it is still the one identified by `id`.
    /// A late exit of a stopped process must not evict its replacement.
    pub fn unregister(&mut self, project_path: &str, id: Uuid) -> Option<LiveEntry> {
        match self.processes.get(project_path) {
            Some(entry) if entry.id == id => {
                info!("Unregistered process for {}", project_path);
                self.processes.remove(project_path)
            }
            _ => None,
        }
    }

    pub fn running_processes(&self) -> Vec<LiveProcessInfo> {
        let mut list: Vec<LiveProcessInfo> =
            self.processes.values().map(LiveEntry::info).collect();
        list.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.path.cmp(&b.path)));
        list
    }

    pub fn drain(&mut self) -> Vec<LiveEntry> {
        self.processes.drain().map(|(_, entry)| entry).collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
