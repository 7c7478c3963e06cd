//! Process supervisor
//! Single task owning every live project process. Commands from the
//! realtime channel and exit notices from watcher tasks arrive through one
//! inbox, so the live-process map never needs a lock.
//!
//! Features:
//! - At most one live process per project path
//! - Missing dependency folder triggers the install command instead of the
//!   requested one
//! - Run and deploy fall back to the commands recorded in the snapshot
//! - Exit reported as soon as the process is gone, even when background
//!   children keep its output pipes open
//! - Dependency cleanup reports the space it freed
//! - Every live process signalled on shutdown

use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use super::output::{pump, OutputStream};
use super::platform;
use super::registry::{LiveEntry, ProcessRegistry};
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::projects::ProjectRegistry;
use crate::protocol::{Command, LiveProcessInfo, ProjectRef, ServerEvent};
use crate::websocket::{ConnectionHub, EventSink};

static INSTALL_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:npm|pnpm|bun)\s+(?:install|i|ci)(?:\s.*)?|yarn(?:\s+install(?:\s.*)?)?)\s*$")
        .expect("install command pattern")
});

/// How long output may keep draining after the process itself has exited
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Messages handled by the supervisor task
#[derive(Debug)]
pub enum Control {
    Command { command: Command, sink: EventSink },
    Exited {
        project_path: String,
        id: Uuid,
        code: Option<i32>,
        sink: EventSink,
    },
    Running {
        reply: oneshot::Sender<Vec<LiveProcessInfo>>,
    },
    Shutdown { reply: oneshot::Sender<()> },
}

/// Cloneable front door to the supervisor task
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    tx: mpsc::UnboundedSender<Control>,
}

impl SupervisorHandle {
    /// Queues a command. Results come back as events on `sink`.
    pub fn dispatch(&self, command: Command, sink: EventSink) {
        let project_path = command.project().path.clone();
        if self
            .tx
            .send(Control::Command {
                command,
                sink: sink.clone(),
            })
            .is_err()
        {
            sink.emit(ServerEvent::error(&project_path, "Supervisor is not running"));
        }
    }

    /// Snapshot of the live processes
    pub async fn running(&self) -> Vec<LiveProcessInfo> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Control::Running { reply }).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Signals every live process and stops the supervisor task
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Control::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Owns the live-process registry. Every state change happens on the one
/// task running [`Supervisor::run`], commands and exit notifications arrive
/// through the same inbox.
pub struct Supervisor {
    processes: ProcessRegistry,
    config: SupervisorConfig,
    projects: Arc<ProjectRegistry>,
    hub: ConnectionHub,
    control_tx: mpsc::UnboundedSender<Control>,
    control_rx: mpsc::UnboundedReceiver<Control>,
}

impl Supervisor {
    pub fn new(
        processes: ProcessRegistry,
        config: SupervisorConfig,
        projects: Arc<ProjectRegistry>,
        hub: ConnectionHub,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        Self {
            processes,
            config,
            projects,
            hub,
            control_tx,
            control_rx,
        }
    }

    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            tx: self.control_tx.clone(),
        }
    }

    /// Moves the supervisor onto its own task
    pub fn spawn(self) -> (SupervisorHandle, JoinHandle<()>) {
        let handle = self.handle();
        let task = tokio::spawn(self.run());
        (handle, task)
    }

    pub async fn run(mut self) {
        info!("Process supervisor started");
        while let Some(msg) = self.control_rx.recv().await {
            match msg {
                Control::Command { command, sink } => self.handle_command(command, &sink),
                Control::Exited {
                    project_path,
                    id,
                    code,
                    sink,
                } => self.on_exit(&project_path, id, code, &sink),
                Control::Running { reply } => {
                    let _ = reply.send(self.processes.running_processes());
                }
                Control::Shutdown { reply } => {
                    self.stop_all();
                    let _ = reply.send(());
                    break;
                }
            }
        }
        info!("Process supervisor stopped");
    }

    fn handle_command(&mut self, command: Command, sink: &EventSink) {
        debug!("Handling {:?}", command);
        let project = command.project().clone();

        let result = match command {
            Command::Run { project, command } => self
                .resolve_command(&project, command, |d| d.run_command, "run")
                .and_then(|cmd| self.start(&project, &cmd, sink)),
            Command::Deploy { project, command } => self
                .resolve_command(&project, command, |d| d.build_command, "build")
                .and_then(|cmd| self.start(&project, &cmd, sink)),
            Command::Install { project } => {
                let install = self.config.install_command.clone();
                self.start(&project, &install, sink)
            }
            Command::Stop { project } => self.stop(&project, sink),
            Command::Open { project } => self.open_folder(&project, sink),
            Command::Clean { project } => self.clean(&project, sink),
        };

        if let Err(e) = result {
            warn!("{}: {}", project.path, e);
            sink.emit(ServerEvent::error(&project.path, e.to_string()));
        }
    }

    /// Uses the requested command, falling back to the one recorded in the
    /// project snapshot.
    fn resolve_command(
        &self,
        project: &ProjectRef,
        requested: Option<String>,
        pick: impl FnOnce(crate::projects::ProjectDescriptor) -> Option<String>,
        kind: &str,
    ) -> Result<String, SupervisorError> {
        requested
            .or_else(|| self.projects.find(&project.path).and_then(pick))
            .ok_or_else(|| SupervisorError::NotFound(format!("No {} command for {}", kind, project.name)))
    }

    /// Starts `command` for the project.
    ///
    /// When the dependency folder is missing the install command runs
    /// instead and the requested command is dropped; the client has to
    /// send it again once the install has exited.
    fn start(
        &mut self,
        project: &ProjectRef,
        command: &str,
        sink: &EventSink,
    ) -> Result<(), SupervisorError> {
        if self.processes.contains(&project.path) {
            return Err(SupervisorError::AlreadyRunning {
                name: project.name.clone(),
            });
        }

        if !self.is_install_command(command) && !self.dependency_dir(&project.path).exists() {
            let install = self.config.install_command.clone();
            sink.emit(ServerEvent::warning(
                &project.path,
                format!(
                    "{} missing in {}, running `{}` first",
                    self.config.dependency_dir, project.name, install
                ),
            ));
            return self.start(project, &install, sink);
        }

        let mut child = platform::shell_command(command, Path::new(&project.path))
            .spawn()
            .map_err(|e| SupervisorError::SpawnFailure(e.to_string()))?;
        let pid = child.id().unwrap_or(0);

        let entry = LiveEntry::new(&project.path, &project.name, pid, command);
        let id = entry.id;
        if self.processes.register(entry).is_err() {
            let _ = child.start_kill();
            return Err(SupervisorError::AlreadyRunning {
                name: project.name.clone(),
            });
        }

        info!("Started `{}` for {} (PID: {})", command, project.name, pid);
        sink.emit(ServerEvent::Start {
            project_path: project.path.clone(),
            command: command.to_string(),
            pid,
        });
        self.broadcast_status();

        tokio::spawn(watch_process(
            child,
            id,
            project.path.clone(),
            sink.clone(),
            self.control_tx.clone(),
        ));
        Ok(())
    }

    fn stop(&mut self, project: &ProjectRef, sink: &EventSink) -> Result<(), SupervisorError> {
        let entry = match self.processes.get(&project.path) {
            Some(entry) => entry.clone(),
            None => {
                return Err(SupervisorError::NotFound(format!(
                    "{} is not running",
                    project.name
                )))
            }
        };

        if let Err(e) = platform::terminate(entry.pid) {
            warn!("Failed to signal PID {} for {}: {}", entry.pid, project.path, e);
        }

        // Removed without waiting for the process to actually go away
        self.processes.unregister(&project.path, entry.id);
        sink.emit(ServerEvent::Stopped {
            project_path: project.path.clone(),
            message: format!("{} stopped", project.name),
        });
        self.broadcast_status();
        Ok(())
    }

    fn clean(&self, project: &ProjectRef, sink: &EventSink) -> Result<(), SupervisorError> {
        let dir = self.dependency_dir(&project.path);
        let dir_name = self.config.dependency_dir.clone();

        if !dir.exists() {
            sink.emit(ServerEvent::info(
                &project.path,
                format!("No {} to clean in {}", dir_name, project.name),
            ));
            return Ok(());
        }

        sink.emit(ServerEvent::info(
            &project.path,
            format!("Cleaning {} in {}...", dir_name, project.name),
        ));
        tokio::spawn(remove_dependencies(dir, dir_name, project.clone(), sink.clone()));
        Ok(())
    }

    fn open_folder(&self, project: &ProjectRef, sink: &EventSink) -> Result<(), SupervisorError> {
        let path = Path::new(&project.path);
        if !path.is_dir() {
            return Err(SupervisorError::NotFound(format!(
                "Folder not found: {}",
                project.path
            )));
        }

        sink.emit(ServerEvent::info(
            &project.path,
            format!("Opening {}", project.path),
        ));
        if let Err(e) = platform::open_in_file_manager(path) {
            warn!("Could not open {}: {}", project.path, e);
        }
        Ok(())
    }

    /// Reports the exit to the requester, then drops the entry unless it was
    /// already removed by a stop.
    fn on_exit(&mut self, project_path: &str, id: Uuid, code: Option<i32>, sink: &EventSink) {
        debug!("Exit notification for {} (code {:?})", project_path, code);
        sink.emit(ServerEvent::Exit {
            project_path: project_path.to_string(),
            code,
        });
        if self.processes.unregister(project_path, id).is_some() {
            self.broadcast_status();
        }
    }

    fn stop_all(&mut self) {
        if self.processes.is_empty() {
            return;
        }
        let entries = self.processes.drain();
        info!("Stopping {} processes on shutdown", entries.len());
        for entry in entries {
            if let Err(e) = platform::terminate(entry.pid) {
                error!("Failed to stop {} (PID: {}): {}", entry.project_path, entry.pid, e);
            }
        }
    }

    fn broadcast_status(&self) {
        debug!("Broadcasting status, {} live", self.processes.len());
        self.hub.broadcast(&ServerEvent::Status {
            processes: self.processes.running_processes(),
        });
    }

    fn dependency_dir(&self, project_path: &str) -> PathBuf {
        Path::new(project_path).join(&self.config.dependency_dir)
    }

    fn is_install_command(&self, command: &str) -> bool {
        command.trim() == self.config.install_command.trim() || INSTALL_COMMAND.is_match(command)
    }
}

/// Lifetime of one spawned process: forwards its output to the requester
/// and reports the exit to the supervisor as soon as the process is gone.
async fn watch_process(
    mut child: Child,
    id: Uuid,
    project_path: String,
    sink: EventSink,
    control: mpsc::UnboundedSender<Control>,
) {
    let readers: Vec<JoinHandle<()>> = [
        child
            .stdout
            .take()
            .map(|out| tokio::spawn(pump(out, OutputStream::Stdout, project_path.clone(), sink.clone()))),
        child
            .stderr
            .take()
            .map(|err| tokio::spawn(pump(err, OutputStream::Stderr, project_path.clone(), sink.clone()))),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = child.wait().await;
    // Background children may hold the pipes open long after the shell is
    // gone; their remaining output keeps flowing after the exit event.
    if timeout(PIPE_DRAIN_GRACE, join_all(readers)).await.is_err() {
        debug!("Output of {} still open after exit, detaching readers", project_path);
    }

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            error!("Failed waiting on process for {}: {}", project_path, e);
            None
        }
    };
    info!("Process for {} exited with {:?}", project_path, code);

    let _ = control.send(Control::Exited {
        project_path,
        id,
        code,
        sink,
    });
}

async fn remove_dependencies(dir: PathBuf, dir_name: String, project: ProjectRef, sink: EventSink) {
    let measured = dir.clone();
    let size = tokio::task::spawn_blocking(move || dir_size(&measured))
        .await
        .unwrap_or(0);

    let output = match platform::remove_dir_command(&dir).output().await {
        Ok(output) => output,
        Err(e) => {
            sink.emit(ServerEvent::error(&project.path, e.to_string()));
            return;
        }
    };

    if output.status.success() {
        info!("Removed {:?} ({} bytes)", dir, size);
        sink.emit(ServerEvent::success(
            &project.path,
            format!(
                "Removed {} from {} (freed {})",
                dir_name,
                project.name,
                format_size(size)
            ),
        ));
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Removing {:?} failed: {}", dir, stderr.trim());
        sink.emit(ServerEvent::error(
            &project.path,
            format!(
                "Failed to remove {} from {} (exit code {:?}) {}",
                dir_name,
                project.name,
                output.status.code(),
                stderr.trim()
            ),
        ));
    }
}

fn dir_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}


#[cfg(all(test, unix))]
mod lifecycle_tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;

    struct Harness {
        handle: SupervisorHandle,
        sink: EventSink,
        events: UnboundedReceiver<ServerEvent>,
        observer: UnboundedReceiver<ServerEvent>,
        project: ProjectRef,
        dir: TempDir,
    }

    impl Harness {
        fn new(install_command: &str, with_deps: bool) -> Self {
            Self::with_projects(install_command, with_deps, None)
        }

        fn with_projects(install_command: &str, with_deps: bool, snapshot: Option<&str>) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let project_dir = dir.path().join("app");
            std::fs::create_dir_all(&project_dir).unwrap();
            if with_deps {
                std::fs::create_dir_all(project_dir.join("node_modules/left-pad")).unwrap();
                std::fs::write(project_dir.join("node_modules/left-pad/index.js"), "module.exports = 1").unwrap();
            }
            let project = ProjectRef {
                path: project_dir.to_string_lossy().to_string(),
                name: "app".to_string(),
            };

            let snapshot_path = dir.path().join("projects.json");
            if let Some(run_command) = snapshot {
                let body = serde_json::json!([{
                    "name": "app",
                    "path": project.path,
                    "runCommand": run_command,
                    "hasDependenciesInstalled": with_deps
                }]);
                std::fs::write(&snapshot_path, body.to_string()).unwrap();
            }

            let hub = ConnectionHub::new();
            let (sink, events) = EventSink::channel();
            let (observer_sink, observer) = EventSink::channel();
            hub.register(sink.clone());
            hub.register(observer_sink);

            let supervisor = Supervisor::new(
                ProcessRegistry::new(),
                SupervisorConfig {
                    dependency_dir: "node_modules".to_string(),
                    install_command: install_command.to_string(),
                },
                Arc::new(ProjectRegistry::open(snapshot_path)),
                hub,
            );
            let (handle, _task) = supervisor.spawn();

            Self {
                handle,
                sink,
                events,
                observer,
                project,
                dir,
            }
        }

        fn run(&self, command: Option<&str>) {
            self.handle.dispatch(
                Command::Run {
                    project: self.project.clone(),
                    command: command.map(str::to_string),
                },
                self.sink.clone(),
            );
        }

        fn send(&self, command: Command) {
            self.handle.dispatch(command, self.sink.clone());
        }

        async fn next(&mut self) -> ServerEvent {
            timeout(Duration::from_secs(10), self.events.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event channel closed")
        }

        /// Collects events up to and including the first one matching `stop`
        async fn until(&mut self, stop: impl Fn(&ServerEvent) -> bool) -> Vec<ServerEvent> {
            let mut seen = Vec::new();
            loop {
                let event = self.next().await;
                let done = stop(&event);
                seen.push(event);
                if done {
                    return seen;
                }
            }
        }

        /// Events already delivered, once every queued command was handled
        async fn drain(&mut self) -> Vec<ServerEvent> {
            self.handle.running().await;
            let mut seen = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                seen.push(event);
            }
            seen
        }

        fn drain_observer(&mut self) -> Vec<ServerEvent> {
            let mut seen = Vec::new();
            while let Ok(event) = self.observer.try_recv() {
                seen.push(event);
            }
            seen
        }
    }

    fn kinds(events: &[ServerEvent]) -> Vec<&'static str> {
        events.iter().map(ServerEvent::kind).collect()
    }

    fn stdout_of(events: &[ServerEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::Stdout { data, .. } => Some(data.as_str()),
                _ => None,
            })
            .collect()
    }

    fn is_exit(event: &ServerEvent) -> bool {
        matches!(event, ServerEvent::Exit { .. })
    }

    #[tokio::test]
    async fn test_run_streams_output_and_exits() {
        let mut h = Harness::new("npm install", true);
        h.run(Some("echo hi"));

        let events = h.until(is_exit).await;
        assert_eq!(events[0].kind(), "start");
        assert_eq!(stdout_of(&events), "hi\n");
        assert!(matches!(events.last(), Some(ServerEvent::Exit { code: Some(0), .. })));

        // The final status broadcast no longer lists the project
        let rest = h.drain().await;
        assert!(matches!(rest.last(), Some(ServerEvent::Status { processes }) if processes.is_empty()));
        assert!(h.handle.running().await.is_empty());

        // Other connections see status changes but never the output
        let observed = h.drain_observer();
        assert!(kinds(&observed).iter().all(|k| *k == "status"));
        assert_eq!(observed.len(), 2);
    }

    #[tokio::test]
    async fn test_background_child_does_not_delay_exit() {
        let mut h = Harness::new("npm install", true);
        let started = std::time::Instant::now();
        h.run(Some("sleep 5 & echo started"));

        let events = h.until(is_exit).await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(stdout_of(&events), "started\n");
        assert!(matches!(events.last(), Some(ServerEvent::Exit { code: Some(0), .. })));

        // The entry is gone so the project can be started again right away
        h.drain().await;
        assert!(h.handle.running().await.is_empty());
        h.run(Some("echo again"));
        let events = h.until(is_exit).await;
        assert_eq!(events[0].kind(), "start");
        assert_eq!(stdout_of(&events), "again\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let mut h = Harness::new("npm install", true);
        h.run(Some("echo oops >&2; exit 3"));

        let events = h.until(is_exit).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, ServerEvent::Stderr { data, .. } if data.contains("oops"))));
        assert!(matches!(events.last(), Some(ServerEvent::Exit { code: Some(3), .. })));
        h.drain().await;
        assert!(h.handle.running().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let mut h = Harness::new("npm install", true);
        h.run(Some("sleep 30"));
        h.run(Some("sleep 30"));

        let events = h.drain().await;
        let errors: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ServerEvent::Error { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ServerEvent::Error { message, .. } if message == "app is already running"));
        assert_eq!(kinds(&events).iter().filter(|k| **k == "start").count(), 1);

        let running = h.handle.running().await;
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].path, h.project.path);

        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_removes_entry_immediately() {
        let mut h = Harness::new("npm install", true);
        h.run(Some("sleep 30"));
        h.drain().await;
        h.drain_observer();

        h.send(Command::Stop {
            project: h.project.clone(),
        });
        let events = h.drain().await;
        assert_eq!(kinds(&events)[..2], ["stopped", "status"]);
        assert!(h.handle.running().await.is_empty());
        assert_eq!(kinds(&h.drain_observer()), ["status"]);

        // The process still reports its own end, killed by a signal
        let exit = match events.iter().find(|e| is_exit(e)) {
            Some(exit) => exit.clone(),
            None => h.until(is_exit).await.pop().unwrap(),
        };
        assert!(matches!(exit, ServerEvent::Exit { code: None, .. }));
        assert!(h.drain_observer().is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_process_is_not_found() {
        let mut h = Harness::new("npm install", true);
        h.send(Command::Stop {
            project: h.project.clone(),
        });

        let events = h.drain().await;
        assert_eq!(kinds(&events), ["error"]);
        assert!(h.drain_observer().is_empty());
    }

    #[tokio::test]
    async fn test_late_exit_does_not_evict_replacement() {
        let mut h = Harness::new("npm install", true);
        h.run(Some("sleep 30"));
        h.send(Command::Stop {
            project: h.project.clone(),
        });
        h.run(Some("sleep 30"));

        // Exit of the first (stopped) process
        h.until(is_exit).await;
        h.drain().await;

        let running = h.handle.running().await;
        assert_eq!(running.len(), 1);
        h.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_dependencies_runs_install_instead() {
        let mut h = Harness::new("echo installing", false);
        h.run(Some("echo hi"));

        let events = h.until(is_exit).await;
        assert_eq!(kinds(&events)[..2], ["warning", "start"]);
        assert!(matches!(&events[1], ServerEvent::Start { command, .. } if command == "echo installing"));
        assert_eq!(stdout_of(&events), "installing\n");

        // The requested command is never issued afterwards
        tokio::time::sleep(Duration::from_millis(300)).await;
        let rest = h.drain().await;
        assert!(!kinds(&rest).contains(&"start"));
        assert!(!stdout_of(&rest).contains("hi"));
    }

    #[tokio::test]
    async fn test_install_action_uses_install_command() {
        let mut h = Harness::new("echo deps", false);
        h.send(Command::Install {
            project: h.project.clone(),
        });

        let events = h.until(is_exit).await;
        assert!(matches!(&events[0], ServerEvent::Start { command, .. } if command == "echo deps"));
        assert!(!kinds(&events).contains(&"warning"));
    }

    #[tokio::test]
    async fn test_run_falls_back_to_snapshot_command() {
        let mut h = Harness::with_projects("npm install", true, Some("echo from-snapshot"));
        h.run(None);

        let events = h.until(is_exit).await;
        assert_eq!(stdout_of(&events), "from-snapshot\n");
    }

    #[tokio::test]
    async fn test_deploy_without_build_command() {
        let mut h = Harness::new("npm install", true);
        h.send(Command::Deploy {
            project: h.project.clone(),
            command: None,
        });

        let events = h.drain().await;
        assert!(matches!(&events[..], [ServerEvent::Error { message, .. }] if message == "No build command for app"));
    }

    #[tokio::test]
    async fn test_clean_without_dependencies() {
        let mut h = Harness::new("npm install", false);
        h.send(Command::Clean {
            project: h.project.clone(),
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        let events = h.drain().await;
        assert_eq!(kinds(&events), ["info"]);
    }

    #[tokio::test]
    async fn test_clean_removes_dependencies() {
        let mut h = Harness::new("npm install", true);
        h.send(Command::Clean {
            project: h.project.clone(),
        });

        let events = h.until(|e| matches!(e, ServerEvent::Success { .. } | ServerEvent::Error { .. })).await;
        assert_eq!(kinds(&events), ["info", "success"]);
        assert!(!h.dir.path().join("app/node_modules").exists());
    }

    #[tokio::test]
    async fn test_open_missing_folder() {
        let mut h = Harness::new("npm install", true);
        h.send(Command::Open {
            project: ProjectRef {
                path: h.dir.path().join("gone").to_string_lossy().to_string(),
                name: "gone".to_string(),
            },
        });

        let events = h.drain().await;
        assert_eq!(kinds(&events), ["error"]);
    }

    #[tokio::test]
    async fn test_spawn_failure_leaves_no_entry() {
        let mut h = Harness::new("npm install", true);
        h.send(Command::Run {
            project: ProjectRef {
                // Working directory that does not exist
                path: h.dir.path().join("projects.json").to_string_lossy().to_string(),
                name: "broken".to_string(),
            },
            command: Some("npm install".to_string()),
        });

        let events = h.drain().await;
        assert_eq!(kinds(&events), ["error"]);
        assert!(h.handle.running().await.is_empty());
    }
}
