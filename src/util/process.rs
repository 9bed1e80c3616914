//! Subprocess execution utilities.
//!
//! Children are spawned with `kill_on_drop`, so cancelling the future that
//! awaits a process terminates the process instead of leaking it.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process did not exit normally
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }

    pub fn stderr_text(&self) -> String {
        self.stderr.join("\n")
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run the process to completion, capturing stdout and stderr line by
    /// line.
    pub async fn exec(&self) -> Result<ProcessOutput> {
        tracing::debug!("Running `{}`", self.display_command());

        let start = Instant::now();
        let mut child = self
            .build_command()
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let stdout = child.stdout.take().context("child stdout was not captured")?;
        let stderr = child.stderr.take().context("child stderr was not captured")?;

        let (stdout, stderr, status) = tokio::try_join!(
            collect_lines(stdout, "stdout"),
            collect_lines(stderr, "stderr"),
            child.wait(),
        )
        .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

async fn collect_lines<R>(reader: R, stream: &'static str) -> std::io::Result<Vec<String>>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    while let Some(line) = lines.next_line().await? {
        tracing::trace!(stream, "{}", line);
        collected.push(line);
    }
    Ok(collected)
}

/// Find an executable on an explicit `PATH` value.
pub fn find_executable_in(name: &str, path_env: &str, cwd: &Path) -> Option<PathBuf> {
    which::which_in(name, Some(path_env), cwd).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("kotlinc").args(["-d", "out.jar", "main.kt"]);
        assert_eq!(pb.display_command(), "kotlinc -d out.jar main.kt");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_captures_streams() {
        let output = ProcessBuilder::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .exec()
            .await
            .unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout_text(), "out");
        assert_eq!(output.stderr_text(), "err");
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let result = ProcessBuilder::new("/definitely/not/a/program").exec().await;
        assert!(result.is_err());
    }
}
