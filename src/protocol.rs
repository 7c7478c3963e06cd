//! Realtime channel wire format
//! Inbound frames are `{action, projectPath, projectName, command?}`,
//! outbound frames are tagged with a "type" field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::ProtocolError;

/// Project a command refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub path: String,
    pub name: String,
}

/// Actions a client may request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run,
    Deploy,
    Install,
    Stop,
    Open,
    Clean,
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Action::Run),
            "deploy" => Ok(Action::Deploy),
            "install" => Ok(Action::Install),
            "stop" => Ok(Action::Stop),
            "open" => Ok(Action::Open),
            "clean" => Ok(Action::Clean),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// A decoded inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run { project: ProjectRef, command: Option<String> },
    Deploy { project: ProjectRef, command: Option<String> },
    Install { project: ProjectRef },
    Stop { project: ProjectRef },
    Open { project: ProjectRef },
    Clean { project: ProjectRef },
}

impl Command {
    pub fn project(&self) -> &ProjectRef {
        match self {
            Command::Run { project, .. }
            | Command::Deploy { project, .. }
            | Command::Install { project }
            | Command::Stop { project }
            | Command::Open { project }
            | Command::Clean { project } => project,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    action: Option<String>,
    project_path: Option<String>,
    project_name: Option<String>,
    command: Option<String>,
}

/// Decodes one text frame into a command
pub fn parse_command(text: &str) -> Result<Command, ProtocolError> {
    let frame: RawFrame = serde_json::from_str(text)?;

    let action: Action = frame
        .action
        .as_deref()
        .ok_or(ProtocolError::MissingField("action"))?
        .parse()?;

    let path = frame
        .project_path
        .filter(|p| !p.trim().is_empty())
        .ok_or(ProtocolError::MissingField("projectPath"))?;

    // Clients occasionally omit the name; fall back to the folder name
    let name = frame
        .project_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| folder_name(&path));

    let project = ProjectRef { path, name };
    let command = frame.command.filter(|c| !c.trim().is_empty());

    Ok(match action {
        Action::Run => Command::Run { project, command },
        Action::Deploy => Command::Deploy { project, command },
        Action::Install => Command::Install { project },
        Action::Stop => Command::Stop { project },
        Action::Open => Command::Open { project },
        Action::Clean => Command::Clean { project },
    })
}

/// Best-effort projectPath of a frame that failed to parse
pub fn salvage_project_path(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("projectPath")?.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn folder_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Live process as shown in status broadcasts and `/api/running`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveProcessInfo {
    pub id: String,
    pub name: String,
    pub path: String,
    pub pid: u32,
    pub command: String,
    pub started_at: DateTime<Utc>,
}

/// Outbound events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    Start {
        project_path: String,
        command: String,
        pid: u32,
    },
    #[serde(rename_all = "camelCase")]
    Stdout { project_path: String, data: String },
    #[serde(rename_all = "camelCase")]
    Stderr { project_path: String, data: String },
    /// `code` is None when the process was ended by a signal
    #[serde(rename_all = "camelCase")]
    Exit {
        project_path: String,
        code: Option<i32>,
    },
    #[serde(rename_all = "camelCase")]
    Error { project_path: String, message: String },
    #[serde(rename_all = "camelCase")]
    Warning { project_path: String, message: String },
    #[serde(rename_all = "camelCase")]
    Info { project_path: String, message: String },
    #[serde(rename_all = "camelCase")]
    Success { project_path: String, message: String },
    #[serde(rename_all = "camelCase")]
    Stopped { project_path: String, message: String },
    Status { processes: Vec<LiveProcessInfo> },
}

impl ServerEvent {
    pub fn error(project_path: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            project_path: project_path.to_string(),
            message: message.into(),
        }
    }

    pub fn warning(project_path: &str, message: impl Into<String>) -> Self {
        ServerEvent::Warning {
            project_path: project_path.to_string(),
            message: message.into(),
        }
    }

    pub fn info(project_path: &str, message: impl Into<String>) -> Self {
        ServerEvent::Info {
            project_path: project_path.to_string(),
            message: message.into(),
        }
    }

    pub fn success(project_path: &str, message: impl Into<String>) -> Self {
        ServerEvent::Success {
            project_path: project_path.to_string(),
            message: message.into(),
        }
    }

    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Start { .. } => "start",
            ServerEvent::Stdout { .. } => "stdout",
            ServerEvent::Stderr { .. } => "stderr",
            ServerEvent::Exit { .. } => "exit",
            ServerEvent::Error { .. } => "error",
            ServerEvent::Warning { .. } => "warning",
            ServerEvent::Info { .. } => "info",
            ServerEvent::Success { .. } => "success",
            ServerEvent::Stopped { .. } => "stopped",
            ServerEvent::Status { .. } => "status",
        }
    }
}
