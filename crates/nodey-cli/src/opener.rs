//! Hands an emitted artifact to the platform's default viewer.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tokio::task::JoinHandle;

/// Open `path` without waiting. Failures are logged, never fatal.
pub fn open_in_viewer(path: &Path) {
    let target = absolute(path);
    match launch(viewer_command(&target)) {
        Ok(_) => tracing::info!("[Opener] Opened {}", target.display()),
        Err(e) => tracing::warn!("[Opener] Could not open {}: {}", target.display(), e),
    }
}

/// Spawn `cmd` detached from the terminal and reap it on a blocking task.
/// Must be called inside a tokio runtime.
pub fn launch(mut cmd: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(tokio::task::spawn_blocking(move || child.wait()))
}

pub fn viewer_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

pub fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}

/// `file://` link shown next to a finished artifact.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", absolute(path).display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_command_targets_path() {
        let cmd = viewer_command(Path::new("/tmp/order_flow.html"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(args.last().map(String::as_str), Some("/tmp/order_flow.html"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launched_viewer_is_reaped() {
        let status = launch(Command::new("true")).unwrap().await.unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_launch_reports_missing_program() {
        assert!(launch(Command::new("nodey-no-such-viewer")).is_err());
    }

    #[test]
    fn test_file_url_is_absolute() {
        let url = file_url(Path::new("order_flow.html"));
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("order_flow.html"));
    }
}
