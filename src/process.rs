//! External command execution.
//!
//! Install, build and dev commands are plain shell strings taken from the
//! configuration or from a manifest's `scripts` table, so they always run
//! through the platform shell inside the plugin folder.

use std::{
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
};

use anyhow::{Context, Result, bail};

/// Build a shell invocation of `command` running in `dir`.
#[must_use]
pub fn shell_command(command: &str, dir: &Path) -> Command {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    cmd.current_dir(dir);
    cmd
}

/// Run `command` in `dir` and wait for it.
///
/// With `quiet`, the command's stdout and stderr are discarded.
///
/// # Errors
///
/// Fails if the shell cannot be started or the command exits unsuccessfully.
pub fn run_command(command: &str, dir: &Path, quiet: bool) -> Result<()> {
    let mut cmd = shell_command(command, dir);

    if quiet {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = cmd
        .status()
        .with_context(|| format!("failed to start `{command}` in {}", dir.display()))?;

    if !status.success() {
        bail!("failed to run `{command}` ({status})");
    }

    Ok(())
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}

/// Handle to a command started in the background.
///
/// The process is not tied to the handle's lifetime: dropping the handle
/// leaves it running.
#[derive(Debug)]
pub struct BackgroundTask {
    command: String,
    child: Child,
}

impl BackgroundTask {
    /// Start `command` in `dir` without waiting for it.
    ///
    /// The process gets its own process group, so a Ctrl+C aimed at the
    /// terminal's foreground group does not reach it. Stdin is always
    /// detached. With `quiet`, output is discarded.
    ///
    /// # Errors
    ///
    /// Fails if the shell cannot be started.
    pub fn spawn(command: &str, dir: &Path, quiet: bool) -> Result<Self> {
        let mut cmd = shell_command(command, dir);
        cmd.stdin(Stdio::null());
        detach(&mut cmd);

        if quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to start `{command}` in {}", dir.display()))?;

        Ok(Self {
            command: command.to_string(),
            child,
        })
    }

    /// The shell command this task runs.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// OS process id of the shell.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Exit status if the process has finished, without blocking.
    ///
    /// # Errors
    ///
    /// Propagates the OS error from polling the process.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>> {
        Ok(self.child.try_wait()?)
    }

    /// Block until the process exits.
    ///
    /// # Errors
    ///
    /// Propagates the OS error from waiting.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        Ok(self.child.wait()?)
    }

    /// Kill the process and reap it.
    ///
    /// Only the shell is signalled; grandchildren it spawned may survive.
    ///
    /// # Errors
    ///
    /// Propagates the OS error from killing or waiting.
    pub fn kill(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        self.child.kill()?;
        Ok(self.child.wait()?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_run_command_success() {
        let tmp = tempfile::tempdir().unwrap();

        run_command("echo built > out.txt", tmp.path(), true).unwrap();

        assert_eq!(
            fs::read_to_string(tmp.path().join("out.txt")).unwrap().trim(),
            "built"
        );
    }

    #[test]
    fn test_run_command_failure() {
        let tmp = tempfile::tempdir().unwrap();

        let err = run_command("exit 3", tmp.path(), true).unwrap_err();

        assert!(err.to_string().contains("failed to run `exit 3`"));
    }

    #[test]
    fn test_background_task_wait() {
        let tmp = tempfile::tempdir().unwrap();

        let mut task = BackgroundTask::spawn("exit 0", tmp.path(), true).unwrap();

        assert_eq!(task.command(), "exit 0");
        assert!(task.id() > 0);
        assert!(task.wait().unwrap().success());
        assert!(task.try_status().unwrap().is_some());
    }

    fn process_group(pid: u32) -> String {
        let output = Command::new("ps")
            .args(["-o", "pgid=", "-p", &pid.to_string()])
            .output()
            .unwrap();
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    #[test]
    fn test_background_task_has_own_process_group() {
        let tmp = tempfile::tempdir().unwrap();

        let mut task = BackgroundTask::spawn("sleep 5", tmp.path(), true).unwrap();
        let child_group = process_group(task.id());
        let parent_group = process_group(std::process::id());
        task.kill().unwrap();

        assert_eq!(child_group, task.id().to_string());
        assert_ne!(child_group, parent_group);
    }

    #[test]
    fn test_background_task_kill() {
        let tmp = tempfile::tempdir().unwrap();

        let mut task = BackgroundTask::spawn("sleep 30", tmp.path(), true).unwrap();

        assert!(task.try_status().unwrap().is_none());
        assert!(!task.kill().unwrap().success());
    }
}
