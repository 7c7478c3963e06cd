use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{info, warn};

/// Builds a command that runs `command_line` through the platform shell in
/// `cwd`, inheriting the environment and asking tools for colored output.
pub fn shell_command(command_line: &str, cwd: &Path) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command_line);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_line);
        // Own process group so a stop reaches everything the shell started
        cmd.process_group(0);
        cmd
    };

    cmd.current_dir(cwd)
        .env("FORCE_COLOR", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Asks a process tree to end. Forceful on Windows, SIGTERM to the process
/// group elsewhere. Does not wait and does not escalate.
pub fn terminate(pid: u32) -> io::Result<()> {
    if pid == 0 {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "no pid"));
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .creation_flags(CREATE_NO_WINDOW)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }

    #[cfg(not(windows))]
    {
        let pgid = -(pid as libc::pid_t);
        // SAFETY: kill(2) with a negative pid only sends a signal to that group
        let rc = unsafe { libc::kill(pgid, libc::SIGTERM) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

/// Recursive forced removal of `dir`
pub fn remove_dir_command(dir: &Path) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "rmdir", "/S", "/Q"]).arg(dir);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("rm");
        cmd.arg("-rf").arg(dir);
        cmd
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd
}

/// Launches the file manager on `path` without waiting for it
pub fn open_in_file_manager(path: &Path) -> io::Result<()> {
    let opener: PathBuf = if cfg!(target_os = "macos") {
        "open".into()
    } else if cfg!(windows) {
        "explorer".into()
    } else {
        which::which("xdg-open").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?
    };

    let mut child = Command::new(&opener)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    info!("Launched {:?} for {:?}", opener, path);

    // Reap it in the background so it does not linger as a zombie
    tokio::spawn(async move {
        if let Err(e) = child.wait().await {
            warn!("File manager launcher failed: {}", e);
        }
    });
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_command_runs_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let output = shell_command("pwd && echo $FORCE_COLOR", dir.path())
            .output()
            .await
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let canonical = dir.path().canonicalize().unwrap();
        assert!(stdout.contains(canonical.to_str().unwrap()));
        assert!(stdout.trim_end().ends_with('1'));
    }

    #[tokio::test]
    async fn test_terminate_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut child = shell_command("sleep 30", dir.path()).spawn().unwrap();
        let pid = child.id().unwrap();

        terminate(pid).unwrap();
        let status = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());
    }

    #[test]
    fn test_terminate_rejects_zero() {
        assert!(terminate(0).is_err());
    }

    #[tokio::test]
    async fn test_remove_dir_command() {
        let dir = tempfile::tempdir().unwrap();
        let deps = dir.path().join("node_modules/pkg");
        std::fs::create_dir_all(&deps).unwrap();
        std::fs::write(deps.join("index.js"), "x").unwrap();

        let status = remove_dir_command(&dir.path().join("node_modules"))
            .status()
            .await
            .unwrap();
        assert!(status.success());
        assert!(!dir.path().join("node_modules").exists());
    }
}
